//! 텍스트 교환 핸들러
//!
//! 프레임 시퀀스: `[text]` → `[SUCCESS_MARKER]`
//! 응답자는 원격에 에러를 흘리지 않는다. 잘못된 요청은 로컬 로그 후
//! 스트림을 버린다.

use tokio::io::BufStream;
use tracing::{debug, warn};

use crate::frame::{read_text_frame, write_text_frame};
use crate::node::NodeContext;
use crate::transport::{DynStream, Transport};
use crate::{Error, Event, Result, PROTOCOL_TEXT, SUCCESS_MARKER};

/// 인바운드 텍스트 스트림 처리 (응답자)
pub async fn handle_inbound(ctx: &NodeContext, peer: String, stream: DynStream) {
    let mut stream = BufStream::new(stream);

    let text = match read_text_frame(&mut stream).await {
        Ok(text) => text,
        Err(e) => {
            warn!("텍스트 요청 읽기 실패: peer={}, {}", peer, e);
            return;
        }
    };

    debug!("텍스트 수신: peer={}, {} bytes", peer, text.len());
    ctx.events.emit(Event::TextReceived { peer, text });

    if let Err(e) = write_text_frame(&mut stream, SUCCESS_MARKER).await {
        warn!("텍스트 응답 기록 실패: {}", e);
    }
}

/// 텍스트 발송 (개시자)
///
/// 토큰당 종료 이벤트는 정확히 한 번: done 또는 error.
pub async fn send(ctx: &NodeContext, token: String, peer: String, text: String) {
    match send_inner(ctx, &peer, &text).await {
        Ok(()) => {
            ctx.events.emit(Event::TextSendDone { token });
        }
        Err(e) => {
            let reason = match e {
                // 결과 프레임의 비정상 내용은 그대로 노출
                Error::Remote(diag) => diag,
                other => other.to_string(),
            };
            ctx.events.emit(Event::TextSendError { token, reason });
        }
    }
}

async fn send_inner(ctx: &NodeContext, peer: &str, text: &str) -> Result<()> {
    let raw = ctx
        .transport
        .open_stream(peer, PROTOCOL_TEXT, ctx.config.dial_timeout())
        .await?;
    let mut stream = BufStream::new(raw);

    write_text_frame(&mut stream, text).await?;

    let result = read_text_frame(&mut stream).await?;
    if result == SUCCESS_MARKER {
        Ok(())
    } else {
        Err(Error::Remote(result))
    }
}
