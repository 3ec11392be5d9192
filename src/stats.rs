//! 노드 상태 틱
//!
//! 고정 주기로 알려진 노드 수와 활성 연결 수를 JSON으로 보고한다.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::node::NodeContext;
use crate::transport::Transport;
use crate::{Event, StateSnapshot};

/// 상태 틱 루프
pub async fn run(ctx: Arc<NodeContext>, mut stop: watch::Receiver<bool>) {
    info!("상태 틱 시작");
    let mut ticker = tokio::time::interval(ctx.config.state_interval());

    loop {
        tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                emit_tick(&ctx);
            }
        }
    }

    info!("상태 틱 정지");
}

fn emit_tick(ctx: &NodeContext) {
    let snapshot = StateSnapshot {
        node_count: ctx.transport.peer_count(),
        conn_count: ctx.transport.connection_total(),
    };

    if let Ok(json) = serde_json::to_string(&snapshot) {
        ctx.events.emit(Event::StateTick { json });
    }
}
