// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the local inference runtime.
//!
//! Provides [`OllamaClient`] for streaming chat completions, embedding
//! requests, and a liveness heartbeat, plus the narrow transient-fault
//! predicate used by the session controller's retry policy.

use std::pin::Pin;
use std::time::Duration;

use braid_core::BraidError;
use futures::Stream;
use tracing::debug;

use crate::ndjson;
use crate::types::{
    ApiErrorBody, ChatChunk, ChatRequest, EmbeddingsRequest, EmbeddingsResponse,
};

/// HTTP client for the runtime's chat and embeddings endpoints.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a new client for the runtime at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, BraidError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BraidError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The runtime base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Opens a streaming chat completion and returns the typed chunk stream.
    ///
    /// A non-2xx status aborts with the upstream error body's message.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChatChunk, BraidError>> + Send>>, BraidError>
    {
        let mut req = request.clone();
        req.stream = true;

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&req)
            .send()
            .await
            .map_err(|e| BraidError::Provider {
                message: format!("chat request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %req.model, "chat stream opened");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BraidError::provider(decode_error_body(status, &body)));
        }

        Ok(ndjson::parse_chunk_stream(response))
    }

    /// Computes an embedding vector for `text`.
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, BraidError> {
        let request = EmbeddingsRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| BraidError::Embedding {
                message: format!("embedding request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BraidError::Embedding {
                message: decode_error_body(status, &body),
            });
        }

        let body: EmbeddingsResponse =
            response.json().await.map_err(|e| BraidError::Embedding {
                message: format!("failed to parse embedding response: {e}"),
            })?;

        Ok(body.embedding)
    }

    /// Checks that the runtime answers on its base URL.
    pub async fn heartbeat(&self) -> Result<(), BraidError> {
        let response = self
            .client
            .get(&self.base_url)
            .send()
            .await
            .map_err(|e| BraidError::Provider {
                message: format!("runtime unreachable at {}: {e}", self.base_url),
                source: Some(Box::new(e)),
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BraidError::provider(format!(
                "runtime answered {} on heartbeat",
                response.status()
            )))
        }
    }
}

/// Decodes a non-2xx error body, falling back to the raw text.
fn decode_error_body(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(body) {
        api_err.error
    } else {
        format!("runtime returned {status}: {body}")
    }
}

/// Narrow match for the one transient fault worth retrying: the runtime
/// reported it could not load the model because the connection hit EOF
/// (the signature of a runtime mid-restart). Anything else is a genuine
/// failure and must not be masked.
pub fn is_transient_load_fault(message: &str) -> bool {
    let m = message.to_ascii_lowercase();
    m.contains("load model") && m.contains("eof")
}
