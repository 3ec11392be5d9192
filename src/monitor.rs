//! 생존 감시
//!
//! 고정 주기로 워치리스트 스냅샷을 돌며 피어별 연결 상태를 독립
//! 태스크로 검증한다. 느린 피어가 틱이나 다른 피어 검사를 막지 못한다.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::node::NodeContext;
use crate::transport::Transport;
use crate::Event;

/// 감시 대상 피어 식별자 집합
///
/// 호출자가 준 최신 스냅샷으로 통째로 교체된다 (병합 없음).
/// 락은 스냅샷 복사/교체 동안만 잡고 I/O에 걸쳐 잡지 않는다.
#[derive(Default)]
pub struct WatchList {
    ids: RwLock<Vec<String>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 전체 교체 (마지막 쓰기 승리)
    pub fn replace(&self, ids: Vec<String>) {
        info!("워치리스트 교체: {}개", ids.len());
        *self.ids.write() = ids;
    }

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Vec<String> {
        self.ids.read().clone()
    }
}

/// 생존 감시 루프
pub async fn run(ctx: Arc<NodeContext>, mut stop: watch::Receiver<bool>) {
    info!("생존 감시 시작");
    let mut ticker = tokio::time::interval(ctx.config.monitor_interval());

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                for peer in ctx.watch_list.snapshot() {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        check_peer(&ctx, &peer).await;
                    });
                }
            }
        }
    }

    info!("생존 감시 정지");
}

/// 피어 하나의 연결 상태 검사
///
/// 활성 연결이 있으면 즉시 연결됨. 없으면 라우팅 계층 조회 후
/// 재연결을 시도하고, 어느 단계든 실패하면 끊김으로 보고한다.
async fn check_peer(ctx: &NodeContext, peer: &str) {
    if ctx.conn.connection_count(peer) > 0 {
        ctx.events.emit(Event::ConnState {
            id: peer.to_string(),
            connected: true,
        });
        return;
    }

    if let Err(e) = ctx.transport.lookup(peer, ctx.config.lookup_timeout()).await {
        debug!("생존 감시 주소 조회 실패: {}, {}", peer, e);
        ctx.events.emit(Event::ConnState {
            id: peer.to_string(),
            connected: false,
        });
        return;
    }

    let connected = ctx
        .conn
        .connect(peer, ctx.config.monitor_dial_timeout())
        .await
        .is_ok();

    ctx.events.emit(Event::ConnState {
        id: peer.to_string(),
        connected,
    });
}
