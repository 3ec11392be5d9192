//! 파일 교환 핸들러
//!
//! 재개 가능, 해시 검증, 청크 단위 전송. 프레임 시퀀스:
//!
//! ```text
//! 송신자: [hash][size][name] →            → <raw size−resume 바이트> →
//! 수신자:                    ← [resume] ←                            ← [SUCCESS_MARKER]
//! ```
//!
//! 캐시 경로는 콘텐츠 해시만의 함수다. 같은 내용의 두 전송은 피어와
//! 무관하게 같은 캐시 항목으로 수렴하고, 수신된 바이트 수가 선언된
//! 크기와 정확히 일치해야만 완료다. 완료 술어가 유일한 판정 기준이며
//! 그 전의 스트림 종료는 전송 에러다.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frame::{read_decimal_frame, read_text_frame, write_text_frame};
use crate::node::NodeContext;
use crate::transport::{DynStream, Transport};
use crate::{Error, Event, Result, PROTOCOL_FILE, SUCCESS_MARKER};

/// 파일 전체를 한 번 읽어 SHA-256 해시와 크기를 구한다
///
/// 전송 단계의 파일 읽기와는 별개의 독립된 전체 읽기다.
pub async fn hash_file(path: &Path, chunk_size: usize) -> Result<(String, u64)> {
    let mut file = File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size];
    let mut size: u64 = 0;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok((hex::encode(hasher.finalize()), size))
}

/// 파일 발송 (개시자)
///
/// 토큰당 종료 이벤트는 정확히 한 번: done 또는 error.
pub async fn send(ctx: &NodeContext, token: String, peer: String, path: PathBuf) {
    match send_inner(ctx, &token, &peer, &path).await {
        Ok(hash) => {
            info!("파일 발송 완료: token={}, hash={}", token, hash);
            ctx.events.emit(Event::FileSendDone { token, hash });
        }
        Err(e) => {
            let reason = match e {
                // 결과 프레임의 비정상 내용은 그대로 노출
                Error::Remote(diag) => diag,
                other => other.to_string(),
            };
            ctx.events.emit(Event::FileSendError { token, reason });
        }
    }
}

async fn send_inner(ctx: &NodeContext, token: &str, peer: &str, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "유효한 파일 이름이 없는 경로",
            ))
        })?
        .to_string();

    let chunk_size = ctx.config.chunk_size;
    let (hash, total) = hash_file(path, chunk_size).await?;
    debug!("파일 해시 계산: {} ({} bytes)", hash, total);

    let raw = ctx
        .transport
        .open_stream(peer, PROTOCOL_FILE, ctx.config.dial_timeout())
        .await?;
    let mut stream = BufStream::new(raw);

    write_text_frame(&mut stream, &hash).await?;
    write_text_frame(&mut stream, &total.to_string()).await?;
    write_text_frame(&mut stream, &name).await?;

    let resume = read_decimal_frame(&mut stream).await?;
    if resume > total {
        return Err(Error::UnexpectedFrame {
            expected: format!("resume offset <= {}", total),
            got: resume.to_string(),
        });
    }

    // resume == total이면 데이터 단계를 통째로 건너뛴다
    if resume < total {
        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(resume)).await?;

        let mut sent: u64 = 0;
        let mut buf = vec![0u8; chunk_size];

        while sent < total - resume {
            let want = ((total - resume - sent).min(buf.len() as u64)) as usize;
            let n = file.read(&mut buf[..want]).await?;
            if n == 0 {
                // 완료 전 EOF는 성공이 아니라 전송 에러
                return Err(Error::TransferIncomplete {
                    expected: total - resume,
                    got: sent,
                });
            }

            stream.write_all(&buf[..n]).await?;
            sent += n as u64;

            ctx.events.emit(Event::FileSendProgress {
                token: token.to_string(),
                total,
                sent: resume + sent,
            });
        }
    }
    stream.flush().await?;

    let result = read_text_frame(&mut stream).await?;
    if result == SUCCESS_MARKER {
        Ok(hash)
    } else {
        Err(Error::Remote(result))
    }
}

/// 인바운드 파일 스트림 처리 (수신자)
pub async fn handle_inbound(ctx: &NodeContext, peer: String, stream: DynStream) {
    let mut stream = BufStream::new(stream);

    // 헤더 프레임 3개: hash, size, name
    let header = async {
        let hash = read_text_frame(&mut stream).await?;
        let total = read_decimal_frame(&mut stream).await?;
        let name = read_text_frame(&mut stream).await?;
        Ok::<_, Error>((hash, total, name))
    }
    .await;

    let (hash, total, name) = match header {
        Ok(h) => h,
        Err(e) => {
            warn!("파일 헤더 읽기 실패: peer={}, {}", peer, e);
            return;
        }
    };

    if !valid_hash(&hash) {
        warn!("유효하지 않은 콘텐츠 해시 버림: peer={}", peer);
        return;
    }
    if !valid_name(&name) {
        warn!("유효하지 않은 파일 이름 버림: peer={}, name={:?}", peer, name);
        return;
    }

    let cache_path = ctx.config.cache_path(&hash);
    let resume = match tokio::fs::metadata(&cache_path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => {
            warn!("캐시 상태 확인 실패: {}", e);
            return;
        }
    };

    if resume > total {
        // 같은 해시에 더 큰 캐시: 선언이 깨진 프로토콜 위반
        warn!(
            "캐시가 선언 크기를 초과: hash={}, cache={}, declared={}",
            hash, resume, total
        );
        return;
    }

    let token = Uuid::new_v4().to_string();
    ctx.events.emit(Event::FileReceiveStart {
        peer: peer.clone(),
        hash: hash.clone(),
        name: name.clone(),
        token: token.clone(),
        total,
    });

    match receive_inner(ctx, &mut stream, &token, &cache_path, resume, total, &name).await {
        Ok(()) => {
            // done 이벤트 이후에는 에러 이벤트로 가지 않는다. 전송은 이미
            // 디스크에 완결됐으므로 마커 기록 실패는 로그만 남긴다.
            if let Err(e) = write_text_frame(&mut stream, SUCCESS_MARKER).await {
                warn!("성공 마커 기록 실패: peer={}, token={}, {}", peer, token, e);
            }
        }
        Err(e) => {
            warn!("파일 수신 실패: peer={}, token={}, {}", peer, token, e);
            ctx.events.emit(Event::FileReceiveError {
                token,
                reason: e.to_string(),
            });
        }
    }
}

async fn receive_inner(
    ctx: &NodeContext,
    stream: &mut BufStream<DynStream>,
    token: &str,
    cache_path: &Path,
    resume: u64,
    total: u64,
    name: &str,
) -> Result<()> {
    if let Some(parent) = cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut cache = OpenOptions::new()
        .create(true)
        .append(true)
        .open(cache_path)
        .await?;

    write_text_frame(stream, &resume.to_string()).await?;
    debug!(
        "파일 수신 시작: token={}, resume={}/{}",
        token, resume, total
    );

    let mut received: u64 = 0;
    let mut buf = vec![0u8; ctx.config.chunk_size];

    while resume + received < total {
        let want = ((total - resume - received).min(buf.len() as u64)) as usize;
        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            return Err(Error::TransferIncomplete {
                expected: total - resume,
                got: received,
            });
        }

        cache.write_all(&buf[..n]).await?;
        received += n as u64;

        ctx.events.emit(Event::FileReceiveProgress {
            token: token.to_string(),
            total,
            received: resume + received,
        });
    }

    cache.flush().await?;
    drop(cache);

    let final_path = unique_destination(ctx.config.receive_dir(), name).await?;
    tokio::fs::rename(cache_path, &final_path).await?;
    info!("파일 수신 완료: token={}, {}", token, final_path.display());

    ctx.events.emit(Event::FileReceiveDone {
        token: token.to_string(),
        path: final_path.display().to_string(),
    });
    Ok(())
}

/// 64자리 소문자 hex만 콘텐츠 해시로 인정
fn valid_hash(hash: &str) -> bool {
    hash.len() == 64
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// 경로 구분자/상위 참조가 섞인 이름 거부
fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

/// 충돌 없는 최종 저장 경로 결정
///
/// 이미 같은 이름이 있으면 덮어쓰지 않고 확장자 앞에 타임스탬프
/// 조각을 붙인다. 그래도 충돌하면 카운터를 더한다.
async fn unique_destination(dir: &Path, name: &str) -> Result<PathBuf> {
    let candidate = dir.join(name);
    if !tokio::fs::try_exists(&candidate).await? {
        return Ok(candidate);
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let mut counter: u32 = 0;
    loop {
        let alt_name = if counter == 0 {
            format!("{}_{}{}", stem, ts, ext)
        } else {
            format!("{}_{}_{}{}", stem, ts, counter, ext)
        };
        let alt = dir.join(alt_name);
        if !tokio::fs::try_exists(&alt).await? {
            return Ok(alt);
        }
        counter += 1;
    }
}
