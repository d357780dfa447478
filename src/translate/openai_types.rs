//! Type definitions for the OpenAI-compatible backend API.
//!
//! Chat messages are shared with the LM Studio side: both dialects use the same
//! message shape, so the backend types double as the inbound message types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Remaining fields (`name`, `tool_call_id`, ...), forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(text.into())),
            tool_calls: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    /// Multi-part content (`[{"type": "text", ...}, {"type": "image_url", ...}]`).
    Parts(Vec<Value>),
}

impl MessageContent {
    /// Whether `needle` occurs in the message text. For multi-part content
    /// only the `text` of each part is searched.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            Self::Text(text) => text.contains(needle),
            Self::Parts(parts) => parts.iter().any(|part| {
                part.get("text")
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.contains(needle))
            }),
        }
    }
}

/// A tool call made by an assistant turn. Opaque to the proxy: it is either
/// dropped or forwarded exactly as received.
pub type ToolCall = Value;

/// A tool definition, forwarded verbatim.
pub type ToolSpec = Value;

// ---------------------------------------------------------------------------
// Request types (what we send TO the backend)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Number>,
}

// ---------------------------------------------------------------------------
// Model listing (what we receive FROM the backend)
// ---------------------------------------------------------------------------

/// One entry of `GET /v1/models`. Fields other than these are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub owned_by: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendModelList {
    #[serde(default)]
    pub data: Vec<BackendModel>,
}
