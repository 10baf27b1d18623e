// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Braid conversation orchestration engine.

use thiserror::Error;

/// The primary error type used across all Braid crates.
#[derive(Debug, Error)]
pub enum BraidError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inference runtime errors (request failure, stream error, upstream `error` payload).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding endpoint errors. Always isolated by callers in the memory path.
    #[error("embedding error: {message}")]
    Embedding { message: String },

    /// Tool executor errors (unknown tool, dispatch failure).
    #[error("tool error: {message}")]
    Tool { message: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BraidError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        BraidError::Provider {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let e = BraidError::Config("bad key".into());
        assert_eq!(e.to_string(), "configuration error: bad key");

        let e = BraidError::provider("model not found");
        assert_eq!(e.to_string(), "provider error: model not found");

        let e = BraidError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert!(e.to_string().contains("disk full"));
    }
}
