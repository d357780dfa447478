//! Model discovery against the backend's `/v1/models` endpoint.

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::logging::SharedLogger;
use crate::proxy::truncate;
use crate::translate::openai_types::{BackendModel, BackendModelList};

/// Fetch the list of models served by the backend.
///
/// # Errors
/// Returns `ProxyError::UpstreamUnavailable` if the backend cannot be reached,
/// answers with something other than a model list, or lists no models at all.
/// An error status from the backend becomes `ProxyError::Other`.
pub async fn fetch_backend_models(
    config: &ProxyConfig,
    client: &reqwest::Client,
    logger: &SharedLogger,
) -> Result<Vec<BackendModel>> {
    let url = config.endpoint("v1/models");
    logger.info("models", format!("Fetching models from {url}"));

    let response = client
        .get(&url)
        .timeout(config.list_timeout())
        .send()
        .await
        .map_err(|e| {
            ProxyError::upstream_unavailable(format!("Failed to fetch models from {url}: {e}"))
        })?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProxyError::other(format!(
            "Backend returned status {} when fetching models: {}",
            status.as_u16(),
            truncate(&body, 500)
        )));
    }

    let body = response.bytes().await.map_err(|e| {
        ProxyError::upstream_unavailable(format!("Failed to read models response: {e}"))
    })?;

    let parsed: BackendModelList = serde_json::from_slice(&body).map_err(|e| {
        ProxyError::upstream_unavailable(format!("Failed to parse models response: {e}"))
    })?;

    if parsed.data.is_empty() {
        return Err(ProxyError::upstream_unavailable("Backend returned no models"));
    }

    logger.info(
        "models",
        format!("Fetched {} models from backend", parsed.data.len()),
    );

    Ok(parsed.data)
}
