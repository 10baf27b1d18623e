// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Braid conversation orchestration engine.
//!
//! This crate provides the error type, wire-level chat types, the
//! collaborator traits the engine dispatches through, and the tolerant
//! JSON extraction primitive shared by the tool-call and memory-editor
//! parsers.

pub mod error;
pub mod json;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::BraidError;
pub use json::extract_first_balanced_object;
pub use traits::{RuntimeLifecycle, ToolExecutor};
pub use types::{ChatMessage, ChatRole, TokenUsage, ToolOutcome};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_are_constructible() {
        let _config = BraidError::Config("test".into());
        let _storage = BraidError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = BraidError::provider("test");
        let _embedding = BraidError::Embedding {
            message: "test".into(),
        };
        let _tool = BraidError::Tool {
            message: "test".into(),
        };
        let _internal = BraidError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_object_safe() {
        fn _assert_tool(_: &dyn ToolExecutor) {}
        fn _assert_lifecycle(_: &dyn RuntimeLifecycle) {}
    }
}
