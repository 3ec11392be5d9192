//! 전송 기판 인터페이스
//!
//! 멀티플렉싱, 전송 암호화, NAT 통과, DHT 라우팅, 로컬 브로드캐스트
//! 발견은 모두 기판의 몫이다. 코어가 기판에 요구하는 능력만 좁은
//! 트레잇으로 고정한다.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::Result;

/// 양방향 바이트 스트림 (StreamSession)
///
/// 프로토콜 식별자 하나, 원격 피어 하나에 묶이며 생성/수락한
/// 핸들러가 독점 소유한다. 교환 재사용 없음.
pub type DynStream = Box<dyn Stream>;

/// 스트림 트레잇 별칭
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Stream for T {}

/// 인바운드 스트림 (프로토콜 식별자로 핸들러에 라우팅)
pub struct IncomingStream {
    /// 원격 피어 식별자
    pub peer: String,

    /// 프로토콜 식별자
    pub protocol: String,

    /// 스트림 본체
    pub stream: DynStream,
}

/// 로컬 브로드캐스트 발견 이벤트
#[derive(Debug, Clone)]
pub struct DiscoveredPeer {
    /// 발견된 피어 식별자
    pub peer: String,

    /// 발견된 주소
    pub addr: String,
}

/// 기판이 코어에 밀어주는 이벤트 소스 묶음
pub struct TransportEvents {
    /// 인바운드 스트림
    pub incoming: mpsc::Receiver<IncomingStream>,

    /// 로컬 브로드캐스트 발견
    pub discovered: mpsc::Receiver<DiscoveredPeer>,
}

/// 전송 기판 능력
#[async_trait]
pub trait Transport: Send + Sync {
    /// 내 피어 식별자
    fn local_peer(&self) -> String;

    /// 현재 청취 주소 목록
    fn listen_addrs(&self) -> Vec<String>;

    /// 알려진/조회된 주소로 피어에 연결
    async fn dial(&self, peer: &str, timeout: Duration) -> Result<()>;

    /// 명시적 주소로 연결 (부트스트랩), 성공 시 상대 피어 식별자 반환
    async fn dial_addr(&self, addr: &str, timeout: Duration) -> Result<String>;

    /// 피어와의 활성 연결 수
    fn connection_count(&self, peer: &str) -> usize;

    /// 라우팅 계층에서 피어 주소 조회
    async fn lookup(&self, peer: &str, timeout: Duration) -> Result<String>;

    /// 연결을 정리 대상에서 제외 (고가중치 태그)
    fn protect(&self, peer: &str, tag: &str);

    /// 캐시된 주소와 다이얼 백오프 상태 제거
    ///
    /// 실패 직후 호출해 다음 시도가 낡은 백오프에 막히지 않게 한다.
    fn clear_dial_cache(&self, peer: &str);

    /// 피어에게 프로토콜 스트림 열기
    async fn open_stream(&self, peer: &str, protocol: &str, timeout: Duration)
        -> Result<DynStream>;

    /// 알려진 노드 수 (상태 틱용)
    fn peer_count(&self) -> usize;

    /// 전체 활성 연결 수 (상태 틱용)
    fn connection_total(&self) -> usize;

    /// 기판 종료
    async fn close(&self);
}
