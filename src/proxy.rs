use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogEntry, LogLevel, SharedLogger};
use crate::translate::openai_types::ChatCompletionRequest;
use crate::translate::relay::{relay, sse_lines};

use futures::stream::Stream;
use std::pin::Pin;

/// Rewritten chunks on their way to the client.
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Open a chat completion on the backend and return its body as a relay stream.
///
/// The backend's status is checked before anything is streamed, so an error
/// status reaches the client as a proper error response rather than a broken
/// event stream.
///
/// # Errors
/// Returns `ProxyError::BackendStream` if the backend cannot be reached or
/// answers with an error status.
pub async fn proxy_chat_stream(
    req: &ChatCompletionRequest,
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
    request_id: &str,
) -> Result<RelayStream> {
    let url = config.endpoint("v1/chat/completions");

    logger.log(
        LogEntry::new(
            LogLevel::Info,
            "chat",
            format!(
                "POST {} model={} stream={} messages={}",
                url,
                req.model,
                req.stream,
                req.messages.len()
            ),
        )
        .with_request_id(request_id),
    );

    // Only the wait for response headers is bounded; a generation may stream
    // for as long as the backend keeps it open.
    let send = client.post(&url).json(req).send();
    let response = tokio::time::timeout(config.chat_timeout(), send)
        .await
        .map_err(|_| {
            ProxyError::backend_stream(
                None,
                format!(
                    "Backend did not respond within {}s",
                    config.chat_timeout().as_secs()
                ),
            )
        })?
        .map_err(|e| {
            ProxyError::backend_stream(
                e.status().map(|s| s.as_u16()),
                format!("Chat request to backend failed: {e}"),
            )
        })?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        logger.log(
            LogEntry::new(
                LogLevel::Warn,
                "chat",
                format!("Backend error status={}: {}", status.as_u16(), truncate(&body, 300)),
            )
            .with_request_id(request_id),
        );
        return Err(ProxyError::backend_stream(
            Some(status.as_u16()),
            format!(
                "Backend returned status {}: {}",
                status.as_u16(),
                truncate(&body, 500)
            ),
        ));
    }

    let lines = sse_lines(response.bytes_stream());
    Ok(Box::pin(relay(lines, logger.clone(), request_id.to_string())))
}

/// Cut `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc");
        // 'é' is two bytes; cutting inside it backs off to the previous boundary
        assert_eq!(truncate("aé", 2), "a");
    }
}
