use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::{LogEntry, LogLevel, SharedLogger};
use crate::models;
use crate::proxy;
use crate::translate::model_list::openai_models_to_studio;
use crate::translate::request::studio_to_openai;
use crate::translate::studio_types::ChatRequest;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Process-wide state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    /// Shared by all requests; pools backend connections.
    pub client: reqwest::Client,
    pub logger: SharedLogger,
}

impl AppState {
    /// Build the state, including the outbound HTTP client.
    pub fn new(config: ProxyConfig, logger: SharedLogger) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            config,
            client,
            logger,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v0/models", get(handle_models))
        .route("/api/v0/chat/completions", post(handle_chat_completions))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Response {
    match models::fetch_backend_models(&state.config, &state.client, &state.logger).await {
        Ok(backend_models) => {
            let list =
                openai_models_to_studio(&backend_models, &state.config.backend.default_model_alias);
            Json(list).into_response()
        }
        Err(e) => {
            state.logger.error("models", format!("Model listing failed: {}", e));
            e.into_response()
        }
    }
}

async fn handle_chat_completions(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let req: ChatRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            state.logger.log(
                LogEntry::new(
                    LogLevel::Error,
                    "chat",
                    format!("Failed to parse request: {}", e),
                )
                .with_request_id(&request_id),
            );
            return ProxyError::malformed_request(format!("Invalid request body: {}", e))
                .into_response();
        }
    };

    state.logger.log(
        LogEntry::new(
            LogLevel::Info,
            "chat",
            format!(
                "Request: model={} streaming={} messages={}",
                req.model,
                req.stream.unwrap_or(false),
                req.messages.len()
            ),
        )
        .with_request_id(&request_id)
        .with_context(serde_json::json!({
            "max_tokens": req.max_tokens,
            "tools": req.tools.as_ref().map_or(0, Vec::len),
        })),
    );

    let outbound = studio_to_openai(&req);

    let stream = match proxy::proxy_chat_stream(
        &outbound,
        &state.config,
        &state.client,
        &state.logger,
        &request_id,
    )
    .await
    {
        Ok(s) => s,
        Err(e) => {
            state.logger.log(
                LogEntry::new(
                    LogLevel::Error,
                    "chat",
                    format!("Streaming setup error: {}", e),
                )
                .with_request_id(&request_id),
            );
            return e.into_response();
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
