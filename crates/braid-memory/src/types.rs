// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types and the similarity scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable, embedding-indexed fact about the user, independent of any
/// single conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Unique identifier for this memory.
    pub id: String,
    /// The fact text.
    pub text: String,
    /// Embedding vector for semantic retrieval. All vectors in one store
    /// come from one embedding model; mixed-model comparison is undefined
    /// and scoring skips length mismatches.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Set each time this memory is rendered into a prompt; drives
    /// stale-memory pruning.
    pub last_retrieved_at: Option<DateTime<Utc>>,
}

impl Memory {
    /// Creates a fresh memory with a new id and the current timestamp.
    pub fn new(text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            embedding,
            created_at: Utc::now(),
            updated_at: None,
            last_retrieved_at: None,
        }
    }
}

/// A memory with its similarity score for the current query.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub score: f32,
}

/// One mutation proposed by the memory editor agent.
///
/// `match` carries a human-readable reference to an existing memory's text,
/// used when the agent does not know the memory's opaque id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MemoryAction {
    Create {
        text: String,
    },
    Update {
        #[serde(default)]
        id: Option<String>,
        #[serde(default, rename = "match")]
        match_text: Option<String>,
        text: String,
    },
    Delete {
        #[serde(default)]
        id: Option<String>,
        #[serde(default, rename = "match")]
        match_text: Option<String>,
    },
}

/// Cosine similarity of two equal-length vectors: `dot(a,b) / (‖a‖·‖b‖)`,
/// defined as `0` when either norm is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom == 0.0 {
        return 0.0;
    }
    dot / denom
}

/// Convert an f32 vector to bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            f32::from_le_bytes(bytes)
        })
        .collect()
}
