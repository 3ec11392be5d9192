//! 노드 설정

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CACHE_DIR_NAME, DEFAULT_CHUNK_SIZE, KEY_FILE_NAME};

/// OPX 노드 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 개인 디렉터리 (개인키 등 비공개 내용)
    pub private_dir: PathBuf,

    /// 공개 디렉터리 (수신 파일, 재개 캐시)
    pub public_dir: PathBuf,

    /// 데이터 전송 청크 크기 (바이트)
    pub chunk_size: usize,

    /// 아웃바운드 스트림/다이얼 타임아웃 (밀리초)
    pub dial_timeout_ms: u64,

    /// 로컬 브로드캐스트 발견 피어 다이얼 타임아웃 (밀리초)
    pub discovery_dial_timeout_ms: u64,

    /// 라우팅 계층 주소 조회 타임아웃 (밀리초)
    pub lookup_timeout_ms: u64,

    /// 생존 감시 재연결 다이얼 타임아웃 (밀리초)
    pub monitor_dial_timeout_ms: u64,

    /// 생존 감시 주기 (밀리초)
    pub monitor_interval_ms: u64,

    /// 상태 틱 주기 (밀리초)
    pub state_interval_ms: u64,

    /// 부트스트랩 주소 목록 (외부에서 해석된 문자열)
    pub bootstrap: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            private_dir: PathBuf::from("private"),
            public_dir: PathBuf::from("public"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            dial_timeout_ms: 3000,
            discovery_dial_timeout_ms: 1000,
            lookup_timeout_ms: 1000,
            monitor_dial_timeout_ms: 1000,
            monitor_interval_ms: 1000,
            state_interval_ms: 1000,
            bootstrap: Vec::new(),
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new(private_dir: impl Into<PathBuf>, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            private_dir: private_dir.into(),
            public_dir: public_dir.into(),
            ..Self::default()
        }
    }

    /// 개인키 파일 경로
    pub fn key_path(&self) -> PathBuf {
        self.private_dir.join(KEY_FILE_NAME)
    }

    /// 재개 캐시 디렉터리 경로
    pub fn cache_dir(&self) -> PathBuf {
        self.public_dir.join(CACHE_DIR_NAME)
    }

    /// 콘텐츠 해시의 캐시 파일 경로
    ///
    /// 해시만으로 결정되므로 동일 콘텐츠는 송신 피어와 무관하게
    /// 같은 캐시 항목으로 수렴한다.
    pub fn cache_path(&self, hash: &str) -> PathBuf {
        self.cache_dir().join(hash)
    }

    /// 수신 파일 최종 저장 디렉터리
    pub fn receive_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn discovery_dial_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_dial_timeout_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn monitor_dial_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_dial_timeout_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn state_interval(&self) -> Duration {
        Duration::from_millis(self.state_interval_ms)
    }
}
