//! 인메모리 전송 기판
//!
//! 실제 기판(멀티플렉싱/암호화/NAT/DHT) 없이 [`Transport`] 능력 표면을
//! 프로세스 안에서 재현한다. 통합 테스트와 데모 바이너리용.
//!
//! - 스트림: `tokio::io::duplex` 쌍, 상대의 인바운드 채널로 전달
//! - 발견: [`MemHub::announce`]가 로컬 브로드캐스트를 흉내냄
//! - 장애 주입: [`MemHub::set_offline`] / [`MemHub::drop_connections`]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::transport::{DiscoveredPeer, DynStream, IncomingStream, Transport, TransportEvents};
use crate::{Error, Result};

const STREAM_BUFFER: usize = 64 * 1024;

/// 등록된 피어 항목
struct PeerEntry {
    addr: String,
    online: Arc<AtomicBool>,
    incoming: mpsc::Sender<IncomingStream>,
    discovered: mpsc::Sender<DiscoveredPeer>,
}

/// 허브 공유 상태
struct HubInner {
    peers: DashMap<String, PeerEntry>,

    /// 피어 쌍 단위 연결 (정렬된 키)
    conns: DashMap<(String, String), ()>,
}

impl HubInner {
    fn pair_key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    fn is_online(&self, peer: &str) -> bool {
        self.peers
            .get(peer)
            .map(|e| e.online.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn connect_pair(&self, a: &str, b: &str) -> Result<()> {
        if !self.is_online(b) {
            return Err(Error::Dial {
                peer: b.to_string(),
                reason: "피어 도달 불가".into(),
            });
        }
        self.conns.insert(Self::pair_key(a, b), ());
        Ok(())
    }

    fn drop_pairs_of(&self, peer: &str) {
        self.conns.retain(|key, _| key.0 != peer && key.1 != peer);
    }
}

/// 인메모리 허브 (프로세스 내 모든 노드의 만남 장소)
#[derive(Clone)]
pub struct MemHub {
    inner: Arc<HubInner>,
}

impl MemHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                peers: DashMap::new(),
                conns: DashMap::new(),
            }),
        }
    }

    /// 피어 등록, 기판 핸들과 이벤트 소스를 돌려준다
    pub fn register(&self, peer: &str) -> (Arc<MemTransport>, TransportEvents) {
        let (incoming_tx, incoming_rx) = mpsc::channel(64);
        let (discovered_tx, discovered_rx) = mpsc::channel(64);

        let online = Arc::new(AtomicBool::new(true));
        self.inner.peers.insert(
            peer.to_string(),
            PeerEntry {
                addr: format!("/mem/{}", peer),
                online: online.clone(),
                incoming: incoming_tx,
                discovered: discovered_tx,
            },
        );

        let transport = Arc::new(MemTransport {
            hub: self.inner.clone(),
            local: peer.to_string(),
            online,
            protected: DashMap::new(),
            cleared: DashMap::new(),
        });

        let events = TransportEvents {
            incoming: incoming_rx,
            discovered: discovered_rx,
        };

        (transport, events)
    }

    /// 로컬 브로드캐스트 발견 흉내: peer를 다른 모든 노드에 알림
    pub async fn announce(&self, peer: &str) {
        let addr = match self.inner.peers.get(peer) {
            Some(entry) => entry.addr.clone(),
            None => return,
        };

        let targets: Vec<mpsc::Sender<DiscoveredPeer>> = self
            .inner
            .peers
            .iter()
            .filter(|e| e.key() != peer)
            .map(|e| e.discovered.clone())
            .collect();

        for tx in targets {
            let _ = tx
                .send(DiscoveredPeer {
                    peer: peer.to_string(),
                    addr: addr.clone(),
                })
                .await;
        }
    }

    /// 장애 주입: 피어를 오프라인 전환 (연결도 모두 끊김)
    pub fn set_offline(&self, peer: &str, offline: bool) {
        if let Some(entry) = self.inner.peers.get(peer) {
            entry.online.store(!offline, Ordering::SeqCst);
        }
        if offline {
            self.inner.drop_pairs_of(peer);
        }
    }

    /// 장애 주입: 피어의 연결만 끊기 (온라인 유지)
    pub fn drop_connections(&self, peer: &str) {
        self.inner.drop_pairs_of(peer);
    }
}

impl Default for MemHub {
    fn default() -> Self {
        Self::new()
    }
}

/// 피어 하나의 기판 핸들
pub struct MemTransport {
    hub: Arc<HubInner>,
    local: String,
    online: Arc<AtomicBool>,
    protected: DashMap<String, String>,
    cleared: DashMap<String, usize>,
}

impl MemTransport {
    /// 테스트용: 보호 태그가 붙었는지
    pub fn is_protected(&self, peer: &str) -> bool {
        self.protected.contains_key(peer)
    }

    /// 테스트용: 다이얼 캐시 정리 호출 횟수
    pub fn dial_cache_clears(&self, peer: &str) -> usize {
        self.cleared.get(peer).map(|v| *v).unwrap_or(0)
    }
}

#[async_trait]
impl Transport for MemTransport {
    fn local_peer(&self) -> String {
        self.local.clone()
    }

    fn listen_addrs(&self) -> Vec<String> {
        vec![format!("/mem/{}", self.local)]
    }

    async fn dial(&self, peer: &str, _timeout: Duration) -> Result<()> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Dial {
                peer: peer.to_string(),
                reason: "로컬 노드 오프라인".into(),
            });
        }
        self.hub.connect_pair(&self.local, peer)
    }

    async fn dial_addr(&self, addr: &str, timeout: Duration) -> Result<String> {
        let peer = addr.strip_prefix("/mem/").ok_or_else(|| Error::Dial {
            peer: addr.to_string(),
            reason: "유효하지 않은 주소".into(),
        })?;
        self.dial(peer, timeout).await?;
        Ok(peer.to_string())
    }

    fn connection_count(&self, peer: &str) -> usize {
        let key = HubInner::pair_key(&self.local, peer);
        usize::from(self.hub.conns.contains_key(&key))
    }

    async fn lookup(&self, peer: &str, _timeout: Duration) -> Result<String> {
        match self.hub.peers.get(peer) {
            Some(entry) if entry.online.load(Ordering::SeqCst) => Ok(entry.addr.clone()),
            _ => Err(Error::Lookup {
                peer: peer.to_string(),
            }),
        }
    }

    fn protect(&self, peer: &str, tag: &str) {
        self.protected.insert(peer.to_string(), tag.to_string());
    }

    fn clear_dial_cache(&self, peer: &str) {
        *self.cleared.entry(peer.to_string()).or_insert(0) += 1;
    }

    async fn open_stream(
        &self,
        peer: &str,
        protocol: &str,
        timeout: Duration,
    ) -> Result<DynStream> {
        // 필요 시 암묵적 다이얼 (기판의 NewStream 의미론)
        self.dial(peer, timeout).await?;

        let remote_tx = self
            .hub
            .peers
            .get(peer)
            .map(|e| e.incoming.clone())
            .ok_or_else(|| Error::Dial {
                peer: peer.to_string(),
                reason: "피어 없음".into(),
            })?;

        let (local_end, remote_end) = tokio::io::duplex(STREAM_BUFFER);

        let delivered = tokio::time::timeout(
            timeout,
            remote_tx.send(IncomingStream {
                peer: self.local.clone(),
                protocol: protocol.to_string(),
                stream: Box::new(remote_end),
            }),
        )
        .await;

        match delivered {
            Ok(Ok(())) => Ok(Box::new(local_end)),
            Ok(Err(_)) => Err(Error::Stream(format!("피어 수신 채널 닫힘: {}", peer))),
            Err(_) => Err(Error::Timeout {
                op: format!("open_stream {}", peer),
            }),
        }
    }

    fn peer_count(&self) -> usize {
        self.hub.peers.len()
    }

    fn connection_total(&self) -> usize {
        self.hub
            .conns
            .iter()
            .filter(|e| {
                let (a, b) = e.key();
                a == &self.local || b == &self.local
            })
            .count()
    }

    async fn close(&self) {
        debug!("인메모리 기판 종료: {}", self.local);
        self.online.store(false, Ordering::SeqCst);
        self.hub.drop_pairs_of(&self.local);
    }
}
