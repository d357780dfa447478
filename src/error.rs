//! Error types for the proxy.
//!
//! Every failure is converted at the handler boundary into a status code plus a
//! `{"detail": "..."}` body, which is the error shape LM Studio clients expect.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The backend could not be reached, or answered with unusable data.
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },

    /// The backend chat call failed. `status` is the backend's own status code
    /// when it answered at all.
    #[error("Backend stream error: {message}")]
    BackendStream { status: Option<u16>, message: String },

    #[error("Malformed request: {message}")]
    MalformedRequest { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ProxyError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream_unavailable(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: msg.into(),
        }
    }

    pub fn backend_stream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::BackendStream {
            status,
            message: msg.into(),
        }
    }

    pub fn malformed_request(msg: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: msg.into(),
        }
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Status code reported to the client for this failure.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::MalformedRequest { .. } => StatusCode::BAD_REQUEST,
            Self::BackendStream {
                status: Some(status),
                ..
            } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ProxyError::upstream_unavailable("down").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::malformed_request("bad json").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::other("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_backend_stream_keeps_backend_status() {
        assert_eq!(
            ProxyError::backend_stream(Some(429), "slow down").status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ProxyError::backend_stream(None, "connection reset").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        // A non-error backend status never turns a failure into a success.
        assert_eq!(
            ProxyError::backend_stream(Some(200), "odd").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response_renders_detail() {
        let resp = ProxyError::upstream_unavailable("no models").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Upstream unavailable: no models");
    }
}
