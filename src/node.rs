//! 노드 수명주기 오케스트레이터
//!
//! 시작 순서: 디렉터리 → 개인키 → 기판 구성 → 핸들러/루프 기동 →
//! 부트스트랩 다이얼. 종료는 협조적: 정지 신호 브로드캐스트 후 루프를
//! 기다리고 기판을 닫는다.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::conn::ConnectionManager;
use crate::event::EventSender;
use crate::identity::Keypair;
use crate::monitor::WatchList;
use crate::transport::{IncomingStream, Transport, TransportEvents};
use crate::{discovery, file, monitor, stats, text};
use crate::{Config, Error, Event, Result, PROTOCOL_FILE, PROTOCOL_TEXT};

/// 모든 컴포넌트에 전달되는 노드 컨텍스트
///
/// 숨은 전역 대신 명시적으로 공유되는 단일 상태 묶음.
pub struct NodeContext {
    pub config: Config,
    pub transport: Arc<dyn Transport>,
    pub conn: ConnectionManager,
    pub events: EventSender,
    pub watch_list: WatchList,
    pub local_peer: String,
}

/// OPX 노드
pub struct Node {
    ctx: Arc<NodeContext>,
    stop_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Node {
    /// 노드 시작
    ///
    /// `build`는 로드된 키쌍으로 전송 기판을 구성한다 (libp2p 호스트
    /// 생성에 해당). 디렉터리 생성과 키 로드 실패는 시작 자체를 막는다.
    pub async fn start<F>(config: Config, events: EventSender, build: F) -> Result<Self>
    where
        F: FnOnce(&Keypair) -> Result<(Arc<dyn Transport>, TransportEvents)>,
    {
        info!("OPX 노드 시작");
        info!("개인 디렉터리: {}", config.private_dir.display());
        info!("공개 디렉터리: {}", config.public_dir.display());

        tokio::fs::create_dir_all(&config.private_dir)
            .await
            .map_err(|e| Error::Startup(format!("개인 디렉터리 생성 실패: {}", e)))?;
        tokio::fs::create_dir_all(&config.public_dir)
            .await
            .map_err(|e| Error::Startup(format!("공개 디렉터리 생성 실패: {}", e)))?;
        tokio::fs::create_dir_all(config.cache_dir())
            .await
            .map_err(|e| Error::Startup(format!("캐시 디렉터리 생성 실패: {}", e)))?;

        let keypair = Keypair::load_or_generate(&config.key_path()).await?;

        let (transport, transport_events) = build(&keypair)?;
        let TransportEvents {
            incoming,
            discovered,
        } = transport_events;

        let local_peer = transport.local_peer();
        let addrs_json =
            serde_json::to_string(&transport.listen_addrs()).unwrap_or_else(|_| "[]".into());

        info!("OPX 노드 기동 완료: {}", local_peer);
        events.emit(Event::Start {
            id: local_peer.clone(),
            addrs_json,
        });

        let ctx = Arc::new(NodeContext {
            conn: ConnectionManager::new(transport.clone()),
            transport,
            events,
            watch_list: WatchList::new(),
            local_peer,
            config,
        });

        let (stop_tx, stop_rx) = watch::channel(false);

        let mut handles = Vec::new();
        handles.push(tokio::spawn(route_incoming(
            ctx.clone(),
            incoming,
            stop_rx.clone(),
        )));
        handles.push(tokio::spawn(discovery::run(
            ctx.clone(),
            discovered,
            stop_rx.clone(),
        )));
        handles.push(tokio::spawn(monitor::run(ctx.clone(), stop_rx.clone())));
        handles.push(tokio::spawn(stats::run(ctx.clone(), stop_rx)));

        // 부트스트랩 다이얼 (피어 간 발견을 돕는 정도, 실패는 로그만)
        for addr in ctx.config.bootstrap.clone() {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                match ctx.conn.connect_addr(&addr, ctx.config.dial_timeout()).await {
                    Ok(peer) => info!("부트스트랩 연결 성공: {} ({})", addr, peer),
                    Err(e) => warn!("부트스트랩 연결 실패: {}, {}", addr, e),
                }
            });
        }

        Ok(Self {
            ctx,
            stop_tx,
            handles,
        })
    }

    /// 내 피어 식별자
    pub fn peer_id(&self) -> String {
        self.ctx.local_peer.clone()
    }

    /// 텍스트 발송 (백그라운드, 결과는 토큰 이벤트로)
    pub fn send_text(&self, token: String, peer: String, text: String) {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            text::send(&ctx, token, peer, text).await;
        });
    }

    /// 파일 발송 (백그라운드, 진행/결과는 토큰 이벤트로)
    pub fn send_file(&self, token: String, peer: String, path: PathBuf) {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            file::send(&ctx, token, peer, path).await;
        });
    }

    /// 생존 감시 대상 교체
    pub fn set_watch_list(&self, ids: Vec<String>) {
        self.ctx.watch_list.replace(ids);
    }

    /// 노드 정지 (모든 루프 종료와 기판 닫힘까지 대기)
    pub async fn stop(self) {
        info!("OPX 노드 정지");
        let _ = self.stop_tx.send(true);

        for handle in self.handles {
            let _ = handle.await;
        }

        self.ctx.transport.close().await;
        self.ctx.events.emit(Event::Stop);
        info!("OPX 노드 정지 완료");
    }
}

/// 인바운드 스트림 라우터
///
/// 프로토콜 식별자로 핸들러를 고르고 스트림마다 독립 태스크를 띄운다.
async fn route_incoming(
    ctx: Arc<NodeContext>,
    mut incoming: mpsc::Receiver<IncomingStream>,
    mut stop: watch::Receiver<bool>,
) {
    info!("인바운드 스트림 라우터 시작");

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            next = incoming.recv() => {
                match next {
                    Some(stream) => dispatch(&ctx, stream),
                    None => break,
                }
            }
        }
    }

    info!("인바운드 스트림 라우터 정지");
}

fn dispatch(ctx: &Arc<NodeContext>, incoming: IncomingStream) {
    let IncomingStream {
        peer,
        protocol,
        stream,
    } = incoming;

    match protocol.as_str() {
        PROTOCOL_TEXT => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                text::handle_inbound(&ctx, peer, stream).await;
            });
        }
        PROTOCOL_FILE => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                file::handle_inbound(&ctx, peer, stream).await;
            });
        }
        other => {
            warn!("알 수 없는 프로토콜 스트림 버림: peer={}, protocol={}", peer, other);
        }
    }
}
