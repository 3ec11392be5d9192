//! 에러 타입 정의

use thiserror::Error;

/// OPX 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("프레임 디코드 에러: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("다이얼 실패: peer={peer}, {reason}")]
    Dial { peer: String, reason: String },

    #[error("주소 조회 실패: peer={peer}")]
    Lookup { peer: String },

    #[error("타임아웃: {op}")]
    Timeout { op: String },

    #[error("예상 밖 프레임: expected {expected}, got {got}")]
    UnexpectedFrame { expected: String, got: String },

    #[error("상대측 실패 응답: {0}")]
    Remote(String),

    #[error("전송 미완료: expected {expected} bytes, got {got}")]
    TransferIncomplete { expected: u64, got: u64 },

    #[error("유효하지 않은 개인키 파일")]
    InvalidKey,

    #[error("시작 실패: {0}")]
    Startup(String),

    #[error("스트림 에러: {0}")]
    Stream(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
