//! 프레임 코덱
//!
//! 한 프레임 = base64(payload) + '\n'. 모든 프로토콜 교환은 고정된
//! 프레임 시퀀스다. 길이 접두어 없이 줄 단위 구분만 쓰므로 페이로드에
//! 개행이 섞이면 안 되는데, base64가 이를 보장한다.
//! 빈 페이로드는 빈 줄로 인코딩된다.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// 한 프레임 기록 (인코딩 + 개행 + flush)
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let mut line = BASE64.encode(payload).into_bytes();
    line.push(b'\n');

    stream.write_all(&line).await?;
    stream.flush().await?;
    Ok(())
}

/// 텍스트 한 프레임 기록
pub async fn write_text_frame<S>(stream: &mut S, text: &str) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    write_frame(stream, text.as_bytes()).await
}

/// 한 프레임 읽기 (개행까지 읽어 base64 디코드)
pub async fn read_frame<S>(stream: &mut S) -> Result<Vec<u8>>
where
    S: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = stream.read_until(b'\n', &mut line).await?;

    if n == 0 {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "프레임 전에 스트림 종료",
        )));
    }

    if line.last() == Some(&b'\n') {
        line.pop();
    }

    if line.is_empty() {
        return Ok(Vec::new());
    }

    let data = BASE64.decode(&line)?;
    Ok(data)
}

/// 텍스트 한 프레임 읽기 (UTF-8 검증 포함)
pub async fn read_text_frame<S>(stream: &mut S) -> Result<String>
where
    S: AsyncBufRead + Unpin,
{
    let data = read_frame(stream).await?;
    String::from_utf8(data).map_err(|_| Error::UnexpectedFrame {
        expected: "utf-8 text".into(),
        got: "invalid utf-8".into(),
    })
}

/// 10진수 텍스트 프레임 읽기 (크기/오프셋 프레임)
pub async fn read_decimal_frame<S>(stream: &mut S) -> Result<u64>
where
    S: AsyncBufRead + Unpin,
{
    let text = read_text_frame(stream).await?;
    text.trim().parse::<u64>().map_err(|_| Error::UnexpectedFrame {
        expected: "decimal number".into(),
        got: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncWriteExt, BufStream};

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (a, b) = duplex(1024);
        let mut writer = BufStream::new(a);
        let mut reader = BufStream::new(b);

        write_frame(&mut writer, b"hello world").await.unwrap();
        let payload = read_frame(&mut reader).await.unwrap();

        assert_eq!(payload, b"hello world");
    }

    #[tokio::test]
    async fn test_empty_payload_is_empty_line() {
        let (a, b) = duplex(64);
        let mut writer = BufStream::new(a);
        let mut reader = BufStream::new(b);

        write_frame(&mut writer, b"").await.unwrap();
        let payload = read_frame(&mut reader).await.unwrap();

        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_base64_is_decode_error() {
        let (mut a, b) = duplex(64);
        let mut reader = BufStream::new(b);

        a.write_all(b"@@@not-base64@@@\n").await.unwrap();
        a.flush().await.unwrap();

        match read_frame(&mut reader).await {
            Err(Error::Decode(_)) => {}
            other => panic!("예상 밖 결과: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eof_is_io_error() {
        let (a, b) = duplex(64);
        drop(a);
        let mut reader = BufStream::new(b);

        match read_frame(&mut reader).await {
            Err(Error::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof);
            }
            other => panic!("예상 밖 결과: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decimal_frame() {
        let (a, b) = duplex(64);
        let mut writer = BufStream::new(a);
        let mut reader = BufStream::new(b);

        write_text_frame(&mut writer, "1048576").await.unwrap();
        assert_eq!(read_decimal_frame(&mut reader).await.unwrap(), 1048576);

        write_text_frame(&mut writer, "not-a-number").await.unwrap();
        match read_decimal_frame(&mut reader).await {
            Err(Error::UnexpectedFrame { .. }) => {}
            other => panic!("예상 밖 결과: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_binary_payload_survives_framing() {
        let (a, b) = duplex(4096);
        let mut writer = BufStream::new(a);
        let mut reader = BufStream::new(b);

        // 개행 포함 이진 데이터도 base64로 감싸져 안전해야 함
        let payload: Vec<u8> = (0..=255u8).chain(std::iter::repeat(b'\n').take(16)).collect();

        write_frame(&mut writer, &payload).await.unwrap();
        assert_eq!(read_frame(&mut reader).await.unwrap(), payload);
    }
}
