//! 노드 신원
//!
//! 개인키는 private 디렉터리에 원시 32바이트로 보존된다.
//! 최초 실행 시 생성, 이후에는 로드. PeerIdentifier는 공개키의
//! SHA-256을 hex로 인코딩한 값이라 같은 키는 항상 같은 ID가 된다.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::{Error, Result};

/// 노드 키쌍
pub struct Keypair {
    secret: StaticSecret,
    public: PublicKey,
}

impl Keypair {
    /// 키 로드 (없으면 생성해서 저장)
    pub async fn load_or_generate(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await? {
            let bytes = tokio::fs::read(path).await?;
            let raw: [u8; 32] = bytes.as_slice().try_into().map_err(|_| Error::InvalidKey)?;
            let secret = StaticSecret::from(raw);
            let public = PublicKey::from(&secret);
            Ok(Self { secret, public })
        } else {
            let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
            let public = PublicKey::from(&secret);
            tokio::fs::write(path, secret.to_bytes()).await?;
            restrict_permissions(path).await;
            info!("새 개인키 생성: {}", path.display());
            Ok(Self { secret, public })
        }
    }

    /// 공개키에서 유도한 피어 식별자 (hex(sha256(public)))
    pub fn peer_id(&self) -> String {
        let digest = Sha256::digest(self.public.as_bytes());
        hex::encode(digest)
    }

    /// 공개키 바이트
    pub fn public_bytes(&self) -> [u8; 32] {
        *self.public.as_bytes()
    }

    /// 개인키 바이트 (기판 신원 구성용)
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }
}

/// 키 파일 권한 축소 (소유자 전용, 실패해도 치명적이지 않음)
#[cfg(unix)]
async fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let _ = tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await;
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) {}
