//! # OPX (Open Peer Exchange)
//!
//! 암호학적으로 식별된 피어 간 텍스트/파일 직접 교환 프로토콜
//!
//! ## 핵심 특징
//! - **라인 프레이밍**: base64 한 줄 = 한 프레임, 고정 시퀀스 핸드쉐이크
//! - **재개 가능 전송**: 콘텐츠 해시 기반 캐시로 중단 지점부터 이어받기
//! - **해시 검증**: SHA-256 콘텐츠 해시를 전송 전에 협상
//! - **연결 보호**: 성공한 연결은 기판의 연결 정리 대상에서 제외
//! - **생존 감시**: 워치리스트 피어를 주기적으로 재검증/재연결
//! - **스트림 단위 격리**: 교환 1회 = 스트림 1개, 실패는 해당 교환만 중단
//!
//! 전송 기판(멀티플렉싱, 전송 암호화, NAT 통과, DHT 라우팅)은
//! [`Transport`] 트레잇 뒤의 외부 협력자이며 이 크레이트는 구현하지 않는다.

pub mod config;
pub mod conn;
pub mod discovery;
pub mod error;
pub mod event;
pub mod file;
pub mod frame;
pub mod identity;
pub mod mem;
pub mod monitor;
pub mod node;
pub mod stats;
pub mod text;
pub mod transport;

pub use config::Config;
pub use conn::ConnectionManager;
pub use error::{Error, Result};
pub use event::{Event, EventSender, StateSnapshot};
pub use identity::Keypair;
pub use mem::MemHub;
pub use monitor::WatchList;
pub use node::Node;
pub use transport::{DiscoveredPeer, DynStream, IncomingStream, Transport, TransportEvents};

/// 프로토콜 버전
pub const PROTOCOL_VERSION: u8 = 1;

/// 프로토콜 식별자: 텍스트 교환
pub const PROTOCOL_TEXT: &str = "/opx/1/text";

/// 프로토콜 식별자: 파일 교환
pub const PROTOCOL_FILE: &str = "/opx/1/file";

/// 성공 마커 (양 프로토콜의 유일한 긍정 응답 페이로드)
pub const SUCCESS_MARKER: &str = "1";

/// 연결 보호 태그 (기판의 연결 수 정리에서 제외)
pub const CONN_PROTECT_TAG: &str = "keep-conn";

/// 기본 청크 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// 개인키 파일 이름 (private 디렉터리 하위)
pub const KEY_FILE_NAME: &str = "my.key";

/// 재개 캐시 디렉터리 이름 (public 디렉터리 하위)
pub const CACHE_DIR_NAME: &str = "cache";
