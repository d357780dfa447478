//! Per-message cleanup applied before a message is forwarded to the backend.

use super::openai_types::{ChatMessage, Role};

/// Text that LM Studio clients put in a `user` turn to mark it as a system turn.
pub const SYSTEM_MESSAGE_MARKER: &str = "This is a system message.";

/// Normalize one message. The input is left untouched; a new message is built.
///
/// - `tool_calls` survives only on `assistant` messages, and only when non-empty.
/// - A `user` message carrying [`SYSTEM_MESSAGE_MARKER`] becomes a `system` message.
#[must_use]
pub fn normalize(message: &ChatMessage) -> ChatMessage {
    let tool_calls = match (message.role, &message.tool_calls) {
        (Role::Assistant, Some(calls)) if !calls.is_empty() => Some(calls.clone()),
        _ => None,
    };

    let role = if message.role == Role::User && claims_system(message) {
        Role::System
    } else {
        message.role
    };

    ChatMessage {
        role,
        content: message.content.clone(),
        tool_calls,
        extra: message.extra.clone(),
    }
}

fn claims_system(message: &ChatMessage) -> bool {
    message
        .content
        .as_ref()
        .is_some_and(|content| content.contains(SYSTEM_MESSAGE_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::openai_types::ToolCall;
    use serde_json::json;

    fn tool_call(id: &str) -> ToolCall {
        json!({
            "id": id,
            "type": "function",
            "function": { "name": "lookup", "arguments": "{}" }
        })
    }

    fn with_tool_calls(role: Role, calls: Vec<ToolCall>) -> ChatMessage {
        let mut msg = ChatMessage::text(role, "hello");
        msg.tool_calls = Some(calls);
        msg
    }

    #[test]
    fn test_tool_calls_stripped_from_non_assistant() {
        for role in [Role::System, Role::User, Role::Tool] {
            let msg = with_tool_calls(role, vec![tool_call("call_1")]);
            let out = normalize(&msg);
            assert!(out.tool_calls.is_none(), "{role:?} kept tool_calls");
        }
    }

    #[test]
    fn test_assistant_tool_calls_preserved() {
        let msg = with_tool_calls(Role::Assistant, vec![tool_call("call_1"), tool_call("call_2")]);
        let out = normalize(&msg);
        assert_eq!(out.tool_calls, msg.tool_calls);
    }

    #[test]
    fn test_empty_assistant_tool_calls_removed() {
        let msg = with_tool_calls(Role::Assistant, Vec::new());
        let out = normalize(&msg);
        assert!(out.tool_calls.is_none());
        assert_eq!(out.role, Role::Assistant);
    }

    #[test]
    fn test_marked_user_message_becomes_system() {
        let msg = ChatMessage::text(
            Role::User,
            "Summarize the chat. This is a system message. Be brief.",
        );
        assert_eq!(normalize(&msg).role, Role::System);
    }

    #[test]
    fn test_unmarked_user_message_stays_user() {
        let msg = ChatMessage::text(Role::User, "this is a system message"); // case differs
        assert_eq!(normalize(&msg).role, Role::User);
    }

    #[test]
    fn test_marker_only_applies_to_user_role() {
        let msg = ChatMessage::text(Role::Assistant, "This is a system message.");
        assert_eq!(normalize(&msg).role, Role::Assistant);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let mut msg = with_tool_calls(Role::User, vec![tool_call("call_1")]);
        msg.content = Some(crate::translate::openai_types::MessageContent::Text(
            "This is a system message.".to_string(),
        ));
        let before = msg.clone();

        let out = normalize(&msg);

        assert_eq!(msg, before);
        assert_eq!(out.role, Role::System);
        assert!(out.tool_calls.is_none());
    }

    #[test]
    fn test_irregular_tool_calls_on_user_turn_are_dropped() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": "hi",
            "tool_calls": [{ "id": "c1", "function": {} }, "not-even-an-object"]
        }))
        .unwrap();

        let out = normalize(&msg);

        assert!(out.tool_calls.is_none());
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            json!({ "role": "user", "content": "hi" })
        );
    }

    #[test]
    fn test_assistant_tool_calls_forwarded_verbatim() {
        let calls = json!([{
            "id": "c1",
            "type": "function",
            "function": { "name": "f", "arguments": null },
            "index": 0
        }]);
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": calls.clone()
        }))
        .unwrap();

        let out = serde_json::to_value(normalize(&msg)).unwrap();

        assert_eq!(out["tool_calls"], calls);
    }
}
