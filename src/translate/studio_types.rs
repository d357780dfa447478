//! Type definitions for the LM Studio REST API (`/api/v0`), the client-facing side.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use super::openai_types::{ChatMessage, ToolSpec};

/// Inbound `POST /api/v0/chat/completions` body.
///
/// Only the fields the proxy forwards are modelled; anything else the client
/// sends is accepted and dropped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// `-1` means "no limit". Any other number is passed on as sent.
    #[serde(default)]
    pub max_tokens: Option<Number>,
    #[serde(default)]
    pub tools: Option<Vec<ToolSpec>>,
    #[serde(default)]
    pub stream: Option<bool>,
}

/// One entry of `GET /api/v0/models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioModel {
    pub id: String,
    pub object: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub publisher: String,
    pub arch: String,
    pub compatibility_type: String,
    pub quantization: String,
    pub state: String,
    pub max_context_length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioModelList {
    pub object: String,
    pub data: Vec<StudioModel>,
}

impl StudioModelList {
    pub fn new(data: Vec<StudioModel>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
