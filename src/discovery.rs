//! 피어 발견 브리지
//!
//! 로컬 브로드캐스트 발견 이벤트를 연결 시도로 바꾼다. 브로드캐스트
//! 발견은 원래 시끄럽고 최선 노력이므로 실패는 보고하지 않는다.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::node::NodeContext;
use crate::transport::DiscoveredPeer;
use crate::Event;

/// 발견 이벤트 루프
pub async fn run(
    ctx: Arc<NodeContext>,
    mut discovered: mpsc::Receiver<DiscoveredPeer>,
    mut stop: watch::Receiver<bool>,
) {
    info!("피어 발견 브리지 시작");

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            event = discovered.recv() => {
                match event {
                    Some(found) => handle_found(&ctx, found),
                    None => break,
                }
            }
        }
    }

    info!("피어 발견 브리지 정지");
}

fn handle_found(ctx: &Arc<NodeContext>, found: DiscoveredPeer) {
    // 자기 자신은 무시
    if found.peer == ctx.local_peer {
        return;
    }

    debug!("브로드캐스트 피어 발견: {}", found.peer);

    let ctx = ctx.clone();
    tokio::spawn(async move {
        match ctx
            .conn
            .connect(&found.peer, ctx.config.discovery_dial_timeout())
            .await
        {
            Ok(()) => {
                ctx.events.emit(Event::PeerDiscovered { id: found.peer });
            }
            Err(e) => {
                // 최선 노력: 조용히 버림
                debug!("발견 피어 연결 실패: {}, {}", found.peer, e);
            }
        }
    });
}
