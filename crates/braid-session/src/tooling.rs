// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-call recognition over completed answer text.
//!
//! A tool call is a JSON object `{ "title": <registered tool>, "arguments":
//! { ... } }` embedded anywhere in the model's answer. Extraction is
//! tolerant (first balanced object, prose ignored); anything that does not
//! parse, or names an unknown or disabled tool, is treated as plain prose.

use braid_core::{extract_first_balanced_object, ChatMessage, ToolExecutor, ToolOutcome};

/// A recognized, enabled tool call.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub title: String,
    pub arguments: serde_json::Value,
}

/// Inspects the accumulated answer text for a single well-formed tool call
/// naming a currently-enabled tool.
pub fn recognize_tool_call(text: &str, tools: &dyn ToolExecutor) -> Option<ToolCall> {
    let value = extract_first_balanced_object(text)?;
    let title = value.get("title")?.as_str()?.to_string();
    let arguments = value.get("arguments")?.clone();
    if !arguments.is_object() {
        return None;
    }
    if !tools.is_enabled(&title) {
        return None;
    }
    Some(ToolCall { title, arguments })
}

/// The synthetic system message fed back to the model after executing a
/// tool call.
pub fn tool_result_message(call: &ToolCall, outcome: &ToolOutcome) -> ChatMessage {
    let payload = serde_json::json!({
        "tool": call.title,
        "success": outcome.success,
        "message": outcome.message,
        "data": outcome.data,
        "error": outcome.error,
    });
    ChatMessage::system(format!("Tool result: {payload}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use braid_core::BraidError;

    struct OneTool;

    #[async_trait]
    impl ToolExecutor for OneTool {
        fn is_enabled(&self, tool_id: &str) -> bool {
            tool_id == "read_file"
        }

        async fn execute(
            &self,
            _tool_id: &str,
            _arguments: &serde_json::Value,
        ) -> Result<ToolOutcome, BraidError> {
            Ok(ToolOutcome::ok("ok"))
        }
    }

    #[test]
    fn recognizes_call_with_surrounding_prose() {
        let text = r#"I'll check that file. {"title": "read_file", "arguments": {"path": "notes.md"}}"#;
        let call = recognize_tool_call(text, &OneTool).unwrap();
        assert_eq!(call.title, "read_file");
        assert_eq!(call.arguments["path"], "notes.md");
    }

    #[test]
    fn unknown_tool_is_plain_prose() {
        let text = r#"{"title": "format_disk", "arguments": {}}"#;
        assert!(recognize_tool_call(text, &OneTool).is_none());
    }

    #[test]
    fn missing_arguments_is_plain_prose() {
        let text = r#"{"title": "read_file"}"#;
        assert!(recognize_tool_call(text, &OneTool).is_none());
    }

    #[test]
    fn non_object_arguments_is_plain_prose() {
        let text = r#"{"title": "read_file", "arguments": "notes.md"}"#;
        assert!(recognize_tool_call(text, &OneTool).is_none());
    }

    #[test]
    fn malformed_json_is_plain_prose() {
        assert!(recognize_tool_call("no call here", &OneTool).is_none());
        assert!(recognize_tool_call("{broken", &OneTool).is_none());
    }

    #[test]
    fn tool_result_message_is_a_system_message() {
        let call = ToolCall {
            title: "read_file".into(),
            arguments: serde_json::json!({}),
        };
        let msg = tool_result_message(&call, &ToolOutcome::ok("file contents"));
        assert_eq!(msg.role, braid_core::ChatRole::System);
        assert!(msg.content.contains("read_file"));
        assert!(msg.content.contains("file contents"));
    }
}
