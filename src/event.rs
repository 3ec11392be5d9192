//! 노드 이벤트 정의
//!
//! 모든 비동기 결과는 단일 이벤트 채널로 전달된다.
//! 프로듀서는 각 백그라운드 태스크, 컨슈머는 상위 계층(UI 브리지 등).
//! 토큰당 종료 이벤트(done/error)는 정확히 한 번이다.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// 노드 상태 스냅샷 (StateTick JSON 페이로드)
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StateSnapshot {
    /// 알려진 노드 수
    #[serde(rename = "nodeCount")]
    pub node_count: usize,

    /// 활성 연결 수
    #[serde(rename = "connCount")]
    pub conn_count: usize,
}

/// 노드 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// 노드 시작 (id, 청취 주소 JSON 배열)
    Start { id: String, addrs_json: String },

    /// 노드 정지 완료
    Stop,

    /// 주기적 상태 틱 (StateSnapshot JSON)
    StateTick { json: String },

    /// 로컬 브로드캐스트로 피어 발견/연결 성공
    PeerDiscovered { id: String },

    /// 워치리스트 피어 연결 상태
    ConnState { id: String, connected: bool },

    /// 텍스트 발송 실패
    TextSendError { token: String, reason: String },

    /// 텍스트 발송 완료
    TextSendDone { token: String },

    /// 상대가 보낸 텍스트 수신
    TextReceived { peer: String, text: String },

    /// 파일 발송 실패
    FileSendError { token: String, reason: String },

    /// 파일 발송 진행 (전체 크기, 누적 발송 바이트)
    FileSendProgress { token: String, total: u64, sent: u64 },

    /// 파일 발송 완료 (협상된 콘텐츠 해시)
    FileSendDone { token: String, hash: String },

    /// 파일 수신 시작 (수신측 생성 토큰으로 이후 진행 이벤트 상관)
    FileReceiveStart {
        peer: String,
        hash: String,
        name: String,
        token: String,
        total: u64,
    },

    /// 파일 수신 실패
    FileReceiveError { token: String, reason: String },

    /// 파일 수신 진행 (전체 크기, 누적 수신 바이트)
    FileReceiveProgress { token: String, total: u64, received: u64 },

    /// 파일 수신 완료 (최종 저장 경로)
    FileReceiveDone { token: String, path: String },
}

/// 이벤트 송신기
///
/// 전송은 블로킹하지 않으며 컨슈머가 닫힌 경우 조용히 버린다.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    /// 새 이벤트 채널 생성
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// 이벤트 발행
    pub fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("이벤트 컨슈머 닫힘, 이벤트 버림");
        }
    }
}
