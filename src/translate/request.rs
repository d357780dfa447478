//! Translate LM Studio chat requests into OpenAI-compatible backend requests.
//!
//! Messages are normalized one by one, a user turn is appended when the
//! conversation would otherwise contain only system turns, and optional fields
//! are forwarded only when they carry meaning for the backend.

use super::message::normalize;
use super::openai_types::{ChatCompletionRequest, ChatMessage, Role};
use super::studio_types::ChatRequest;

/// User turn appended when every message is a system message.
pub const CONTINUE_PROMPT: &str = "Please continue.";

/// LM Studio's "no limit" value for `max_tokens`; the backend expects the field absent.
pub const UNLIMITED_MAX_TOKENS: f64 = -1.0;

/// Build the backend request for an LM Studio chat request.
/// Pure function: the inbound request is only read.
#[must_use]
pub fn studio_to_openai(req: &ChatRequest) -> ChatCompletionRequest {
    let mut messages: Vec<ChatMessage> = req.messages.iter().map(normalize).collect();

    if only_system_turns(&messages) {
        tracing::info!(
            messages = messages.len(),
            "All messages are system messages, appending a user turn"
        );
        messages.push(ChatMessage::text(Role::User, CONTINUE_PROMPT));
    }

    let tools = req.tools.as_ref().filter(|tools| !tools.is_empty()).cloned();
    let max_tokens = req
        .max_tokens
        .clone()
        .filter(|n| n.as_f64() != Some(UNLIMITED_MAX_TOKENS));

    ChatCompletionRequest {
        model: req.model.clone(),
        stream: req.stream.unwrap_or(false),
        tools,
        messages,
        max_tokens,
    }
}

fn only_system_turns(messages: &[ChatMessage]) -> bool {
    !messages.is_empty() && messages.iter().all(|m| m.role == Role::System)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Number};

    fn request(body: serde_json::Value) -> ChatRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_simple_request() {
        let req = request(json!({
            "model": "groq-llama4-scout",
            "messages": [
                { "role": "system", "content": "You are helpful" },
                { "role": "user", "content": "Hello" }
            ],
            "max_tokens": 256,
            "stream": true
        }));

        let out = studio_to_openai(&req);

        assert_eq!(out.model, "groq-llama4-scout");
        assert!(out.stream);
        assert_eq!(out.max_tokens, Some(256.into()));
        assert!(out.tools.is_none());
        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.messages[0].role, Role::System);
        assert_eq!(out.messages[1].role, Role::User);
    }

    #[test]
    fn test_all_system_turns_get_continue_prompt() {
        let req = request(json!({
            "model": "m",
            "messages": [
                { "role": "system", "content": "Rules" },
                { "role": "user", "content": "Context. This is a system message." }
            ]
        }));

        let out = studio_to_openai(&req);

        assert_eq!(out.messages.len(), 3);
        assert_eq!(out.messages[1].role, Role::System);
        assert_eq!(out.messages[2], ChatMessage::text(Role::User, CONTINUE_PROMPT));
    }

    #[test]
    fn test_empty_messages_stay_empty() {
        let out = studio_to_openai(&request(json!({ "model": "m", "messages": [] })));
        assert!(out.messages.is_empty());
    }

    #[test]
    fn test_mixed_roles_get_no_continue_prompt() {
        let req = request(json!({
            "model": "m",
            "messages": [
                { "role": "system", "content": "Rules" },
                { "role": "assistant", "content": "Ok" }
            ]
        }));
        assert_eq!(studio_to_openai(&req).messages.len(), 2);
    }

    #[test]
    fn test_max_tokens_handling() {
        let unlimited = studio_to_openai(&request(json!({ "model": "m", "max_tokens": -1 })));
        assert!(unlimited.max_tokens.is_none());

        let bounded = studio_to_openai(&request(json!({ "model": "m", "max_tokens": 256 })));
        assert_eq!(bounded.max_tokens, Some(256.into()));

        let float_unlimited =
            studio_to_openai(&request(json!({ "model": "m", "max_tokens": -1.0 })));
        assert!(float_unlimited.max_tokens.is_none());

        let absent = studio_to_openai(&request(json!({ "model": "m" })));
        assert!(absent.max_tokens.is_none());
    }

    #[test]
    fn test_unusual_max_tokens_forwarded_as_sent() {
        let fractional = studio_to_openai(&request(json!({ "model": "m", "max_tokens": 256.0 })));
        assert_eq!(
            serde_json::to_value(&fractional).unwrap()["max_tokens"],
            json!(256.0)
        );

        let huge = studio_to_openai(&request(json!({ "model": "m", "max_tokens": u64::MAX })));
        assert_eq!(huge.max_tokens, Some(Number::from(u64::MAX)));
    }

    #[test]
    fn test_tools_forwarded_only_when_present() {
        let empty = studio_to_openai(&request(json!({ "model": "m", "tools": [] })));
        assert!(empty.tools.is_none());

        let tool = json!({
            "type": "function",
            "function": { "name": "get_weather", "parameters": { "type": "object" } }
        });
        let some = studio_to_openai(&request(json!({ "model": "m", "tools": [tool.clone()] })));
        assert_eq!(some.tools, Some(vec![tool]));
    }

    #[test]
    fn test_stream_defaults_to_false() {
        let out = studio_to_openai(&request(json!({ "model": "m" })));
        assert!(!out.stream);
    }

    #[test]
    fn test_serialized_body_has_no_extra_fields() {
        let req = request(json!({
            "model": "m",
            "messages": [{ "role": "user", "content": "hi", "tool_calls": [] }],
            "max_tokens": -1,
            "tools": [],
            "temperature": 0.2,
            "stream": true
        }));

        let body = serde_json::to_value(studio_to_openai(&req)).unwrap();

        assert_eq!(
            body,
            json!({
                "model": "m",
                "stream": true,
                "messages": [{ "role": "user", "content": "hi" }]
            })
        );
    }
}
