// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the local inference runtime (Ollama-compatible API).
//!
//! Streaming chat completions arrive as newline-delimited JSON with
//! separate `thinking` and `content` fields per chunk; embeddings come
//! from a companion endpoint. This crate also houses
//! [`is_transient_load_fault`], the narrow predicate the session
//! controller's retry policy is built on.

pub mod client;
pub mod lifecycle;
pub mod ndjson;
pub mod types;

pub use client::{is_transient_load_fault, OllamaClient};
pub use lifecycle::HeartbeatLifecycle;
pub use types::{ChatChunk, ChatRequest, ChunkMessage, GenerationOptions};
