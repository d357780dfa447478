//! Relay of the backend's SSE stream to the LM Studio client.
//!
//! The backend body is split into lines ([`sse_lines`]), each line is rewritten
//! on its own ([`rewrite_line`]), and [`relay`] strings the two together into a
//! lazy stream that stops pulling from the backend as soon as `[DONE]` is seen.
//! Dropping the relay stream drops the backend body with it.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde_json::Value;

use crate::error::ProxyError;
use crate::logging::{LogEntry, LogLevel, SharedLogger};

/// Payload that marks the end of an OpenAI-style stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Value written into `system_fingerprint` of every forwarded chunk.
pub const PROXY_FINGERPRINT: &str = "proxy_fingerprint";

const DATA_PREFIX: &str = "data:";

/// Result of rewriting a single backend line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// Not a `data:` line (comment, keep-alive, blank separator); forwarded as is.
    Passthrough(String),
    /// A JSON chunk with the proxy fingerprint injected.
    Chunk(String),
    /// A `data:` line whose payload is not a JSON object; forwarded as is.
    Unparsed(String),
    /// The `[DONE]` sentinel. Nothing after it is relayed.
    Done(String),
}

impl RelayFrame {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passthrough(s) | Self::Chunk(s) | Self::Unparsed(s) | Self::Done(s) => s,
        }
    }

    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Passthrough(s) | Self::Chunk(s) | Self::Unparsed(s) | Self::Done(s) => s,
        }
    }
}

/// Rewrite one backend line (without its line terminator) into client bytes.
#[must_use]
pub fn rewrite_line(line: &str) -> RelayFrame {
    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return RelayFrame::Passthrough(format!("{line}\n"));
    };

    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        return RelayFrame::Done(format!("{DATA_PREFIX} {DONE_SENTINEL}\n\n"));
    }

    match inject_fingerprint(payload) {
        Some(json) => RelayFrame::Chunk(format!("{DATA_PREFIX} {json}\n\n")),
        None => RelayFrame::Unparsed(format!("{line}\n\n")),
    }
}

fn inject_fingerprint(payload: &str) -> Option<String> {
    let mut value: Value = serde_json::from_str(payload).ok()?;
    value.as_object_mut()?.insert(
        "system_fingerprint".to_string(),
        Value::String(PROXY_FINGERPRINT.to_string()),
    );
    serde_json::to_string(&value).ok()
}

/// Split a byte stream into lines.
///
/// Lines end at `\n`; a trailing `\r` is dropped. Each line is decoded only once
/// it is complete, so a UTF-8 sequence split across chunks comes out intact.
/// An unterminated final line is still yielded. The first error ends the stream.
pub fn sse_lines<S, E>(bytes: S) -> impl Stream<Item = Result<String, E>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Send + 'static,
{
    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();

        tokio::pin!(bytes);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    buffer.extend_from_slice(&chunk);
                    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buffer.drain(..=pos).collect();
                        yield Ok(decode_line(&line[..pos]));
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if !buffer.is_empty() {
            yield Ok(decode_line(&buffer));
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Rewrite a stream of backend lines into the stream sent to the client.
///
/// Output order follows input order and only one line is held at a time. The
/// input is not polled again after `[DONE]`. A read error ends the output with
/// [`ProxyError::BackendStream`]; whatever was already yielded stays delivered.
pub fn relay<S, E>(
    lines: S,
    logger: SharedLogger,
    request_id: String,
) -> impl Stream<Item = Result<String, ProxyError>> + Send + 'static
where
    S: Stream<Item = Result<String, E>> + Send + 'static,
    E: Into<ProxyError> + Send + 'static,
{
    async_stream::stream! {
        tokio::pin!(lines);
        let mut chunks = 0usize;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let err: ProxyError = e.into();
                    let status = match &err {
                        ProxyError::Http(e) => e.status().map(|s| s.as_u16()),
                        ProxyError::BackendStream { status, .. } => *status,
                        _ => None,
                    };
                    let message = format!("An unexpected error occurred during streaming: {err}");
                    logger.log(
                        LogEntry::new(LogLevel::Error, "relay", message.clone())
                            .with_request_id(request_id.clone()),
                    );
                    yield Err(ProxyError::backend_stream(status, message));
                    return;
                }
            };

            let frame = rewrite_line(&line);
            match &frame {
                RelayFrame::Chunk(_) => chunks += 1,
                RelayFrame::Unparsed(_) => logger.log(
                    LogEntry::new(
                        LogLevel::Debug,
                        "relay",
                        format!("Could not parse JSON from line, passing through: {line}"),
                    )
                    .with_request_id(request_id.clone()),
                ),
                RelayFrame::Done(_) => logger.log(
                    LogEntry::new(
                        LogLevel::Info,
                        "relay",
                        format!("Detected [DONE] after {chunks} chunks, closing stream"),
                    )
                    .with_request_id(request_id.clone()),
                ),
                RelayFrame::Passthrough(_) => {}
            }

            let terminal = frame.is_terminal();
            yield Ok(frame.into_string());
            if terminal {
                return;
            }
        }

        logger.log(
            LogEntry::new(
                LogLevel::Info,
                "relay",
                format!("Backend stream ended after {chunks} chunks"),
            )
            .with_request_id(request_id),
        );
    }
}
