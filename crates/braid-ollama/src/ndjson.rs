// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NDJSON stream parser for the runtime's chat responses.
//!
//! Converts a reqwest response byte stream into typed [`ChatChunk`]s. The
//! runtime emits one JSON object per line; chunk boundaries do not align
//! with line boundaries, so bytes are buffered until a newline completes a
//! line. An `error` field in any line surfaces as a provider error.

use std::collections::VecDeque;
use std::pin::Pin;

use braid_core::BraidError;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

use crate::types::ChatChunk;

/// Assembles complete lines from an arbitrary byte chunking.
#[derive(Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Appends bytes and returns every newline-terminated line completed by
    /// them. Blank lines are dropped.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Flushes any trailing unterminated line at end of stream.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let line = String::from_utf8_lossy(&self.buf).trim().to_string();
        self.buf.clear();
        (!line.is_empty()).then_some(line)
    }
}

struct DecodeState {
    bytes: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    lines: LineBuffer,
    queued: VecDeque<Result<ChatChunk, BraidError>>,
    exhausted: bool,
}

/// Parses a streaming chat response into a stream of typed [`ChatChunk`]s.
pub fn parse_chunk_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<ChatChunk, BraidError>> + Send>> {
    let state = DecodeState {
        bytes: Box::pin(response.bytes_stream()),
        lines: LineBuffer::default(),
        queued: VecDeque::new(),
        exhausted: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queued.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    for line in state.lines.push(&bytes) {
                        state.queued.push_back(parse_line(&line));
                    }
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    state.queued.push_back(Err(BraidError::Provider {
                        message: format!("stream read failed: {e}"),
                        source: Some(Box::new(e)),
                    }));
                }
                None => {
                    state.exhausted = true;
                    if let Some(line) = state.lines.finish() {
                        state.queued.push_back(parse_line(&line));
                    }
                }
            }
        }
    }))
}

/// Parses one NDJSON line into a chunk; an `error` field becomes an error.
fn parse_line(line: &str) -> Result<ChatChunk, BraidError> {
    match serde_json::from_str::<ChatChunk>(line) {
        Ok(mut chunk) => {
            if let Some(message) = chunk.error.take() {
                return Err(BraidError::provider(message));
            }
            Ok(chunk)
        }
        Err(e) => Err(BraidError::provider(format!(
            "malformed stream chunk: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_reassembles_split_lines() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"{\"done\":").is_empty());
        let lines = buf.push(b"false}\n{\"done\":true}\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"done":false}"#);
        assert_eq!(lines[1], r#"{"done":true}"#);
    }

    #[test]
    fn line_buffer_skips_blank_lines() {
        let mut buf = LineBuffer::default();
        let lines = buf.push(b"\n\n{\"done\":true}\n\n");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn line_buffer_flushes_trailing_line() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"{\"done\":true}").is_empty());
        assert_eq!(buf.finish().as_deref(), Some(r#"{"done":true}"#));
        assert!(buf.finish().is_none());
    }

    #[test]
    fn parse_line_maps_error_field_to_provider_error() {
        let err = parse_line(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn parse_line_rejects_malformed_json() {
        let err = parse_line("not json").unwrap_err();
        assert!(err.to_string().contains("malformed stream chunk"));
    }

    #[test]
    fn parse_line_reads_content_chunk() {
        let chunk = parse_line(r#"{"message":{"content":"Hi"},"done":false}"#).unwrap();
        assert_eq!(
            chunk.message.unwrap().content.as_deref(),
            Some("Hi")
        );
    }

    #[tokio::test]
    async fn parses_streaming_response_end_to_end() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"thinking\":\"let me think\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"Hello\"},\"done\":false}\n",
            "{\"done\":true,\"prompt_eval_count\":3,\"eval_count\":5}\n",
        );
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-ndjson")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let response = reqwest::get(&server.uri()).await.unwrap();
        let mut stream = parse_chunk_stream(response);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first.message.unwrap().thinking.as_deref(),
            Some("let me think")
        );

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.message.unwrap().content.as_deref(), Some("Hello"));

        let last = stream.next().await.unwrap().unwrap();
        assert!(last.done);
        assert_eq!(last.eval_count, Some(5));

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn error_line_mid_stream_surfaces_as_provider_error() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = concat!(
            "{\"message\":{\"content\":\"partial\"},\"done\":false}\n",
            "{\"error\":\"runtime shutting down\"}\n",
        );
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let response = reqwest::get(&server.uri()).await.unwrap();
        let mut stream = parse_chunk_stream(response);

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("runtime shutting down"));
    }
}
