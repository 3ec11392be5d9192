//! 연결 관리자
//!
//! 제한 시간 내 다이얼, 성공 시 연결 보호, 실패 시 낡은
//! 다이얼 캐시/백오프 정리.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::transport::Transport;
use crate::{Result, CONN_PROTECT_TAG};

/// 연결 관리자
#[derive(Clone)]
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 피어 연결
    ///
    /// 실패 시 캐시 주소/백오프를 지워 다음 시도가 낡은 상태에
    /// 단락되지 않게 한 뒤 실패를 반환한다. 성공 시 연결을 보호한다.
    pub async fn connect(&self, peer: &str, timeout: Duration) -> Result<()> {
        match self.transport.dial(peer, timeout).await {
            Ok(()) => {
                self.transport.protect(peer, CONN_PROTECT_TAG);
                Ok(())
            }
            Err(e) => {
                debug!("연결 실패, 다이얼 캐시 정리: peer={}", peer);
                self.transport.clear_dial_cache(peer);
                Err(e)
            }
        }
    }

    /// 명시적 주소로 연결 (부트스트랩)
    pub async fn connect_addr(&self, addr: &str, timeout: Duration) -> Result<String> {
        let peer = self.transport.dial_addr(addr, timeout).await?;
        self.transport.protect(&peer, CONN_PROTECT_TAG);
        Ok(peer)
    }

    /// 피어와의 활성 연결 수 (값싼 생존 확인)
    pub fn connection_count(&self, peer: &str) -> usize {
        self.transport.connection_count(peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemHub;

    #[tokio::test]
    async fn test_connect_protects_on_success() {
        let hub = MemHub::new();
        let (a, _ea) = hub.register("peer-a");
        let (_b, _eb) = hub.register("peer-b");

        let manager = ConnectionManager::new(a.clone());
        manager.connect("peer-b", Duration::from_secs(1)).await.unwrap();

        assert_eq!(manager.connection_count("peer-b"), 1);
        assert!(a.is_protected("peer-b"));
    }

    #[tokio::test]
    async fn test_connect_clears_cache_on_failure() {
        let hub = MemHub::new();
        let (a, _ea) = hub.register("peer-a");

        let manager = ConnectionManager::new(a.clone());
        let result = manager.connect("peer-unknown", Duration::from_millis(100)).await;

        assert!(result.is_err());
        assert_eq!(a.dial_cache_clears("peer-unknown"), 1);
    }
}
