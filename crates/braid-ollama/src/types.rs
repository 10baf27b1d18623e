// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the local inference runtime's chat and embeddings
//! endpoints.

use braid_core::ChatMessage;
use serde::{Deserialize, Serialize};

/// Request body for `POST /api/chat`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

/// Sampling options forwarded to the runtime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// One newline-delimited JSON object from the chat stream.
///
/// Reasoning tokens arrive in `message.thinking`, answer tokens in
/// `message.content`. The terminal object has `done: true` and carries the
/// usage counters. An `error` field aborts the stream with that message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

/// The message fragment inside one stream chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// Request body for `POST /api/embeddings`.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub prompt: String,
}

/// Response body of the embeddings endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsResponse {
    pub embedding: Vec<f32>,
}

/// Error body returned by the runtime on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_absent_options() {
        let request = ChatRequest {
            model: "llama3.1:8b".into(),
            messages: vec![ChatMessage::user("hi")],
            stream: true,
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("options").is_none());
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn chat_request_serializes_temperature() {
        let request = ChatRequest {
            model: "llama3.1:8b".into(),
            messages: vec![],
            stream: true,
            options: Some(GenerationOptions {
                temperature: Some(0.7),
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["temperature"], 0.7);
    }

    #[test]
    fn chunk_deserializes_thinking_and_content() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"message":{"role":"assistant","thinking":"hmm","content":"Hi"},"done":false}"#,
        )
        .unwrap();
        let message = chunk.message.unwrap();
        assert_eq!(message.thinking.as_deref(), Some("hmm"));
        assert_eq!(message.content.as_deref(), Some("Hi"));
        assert!(!chunk.done);
    }

    #[test]
    fn terminal_chunk_carries_usage_counters() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"done":true,"prompt_eval_count":12,"eval_count":34}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.prompt_eval_count, Some(12));
        assert_eq!(chunk.eval_count, Some(34));
        assert!(chunk.message.is_none());
    }
}
