// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Braid engine.
//!
//! Memories are embedding-indexed facts retrieved by cosine similarity
//! (a deliberate linear scan -- the store is small and the scan is exact)
//! and kept current by an asynchronous editor agent that proposes
//! create/update/delete actions after each exchange.

pub mod editor;
pub mod matcher;
pub mod retrieval;
pub mod store;
pub mod types;

pub use editor::{MemoryEditJob, MemoryEditor};
pub use matcher::{normalize_text, resolve_reference};
pub use retrieval::{MemoryRetriever, RetrievalParams, RetrievedMemories};
pub use store::{MemoryStore, SqliteMemoryStore};
pub use types::{cosine_similarity, Memory, MemoryAction, ScoredMemory};
