// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: URL schemes, threshold ranges, budget relationships.

use crate::diagnostic::ConfigError;
use crate::model::BraidConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &BraidConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let base_url = config.runtime.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "runtime.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("runtime.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    if !(0.0..=2.0).contains(&config.runtime.temperature) {
        errors.push(ConfigError::Validation {
            message: format!(
                "runtime.temperature must be within 0.0..=2.0, got {}",
                config.runtime.temperature
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.memory.min_score) {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.min_score must be within 0.0..=1.0, got {}",
                config.memory.min_score
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.memory.match_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.match_threshold must be within 0.0..=1.0, got {}",
                config.memory.match_threshold
            ),
        });
    }

    if config.memory.top_k > config.memory.candidate_k {
        errors.push(ConfigError::Validation {
            message: format!(
                "memory.top_k ({}) must not exceed memory.candidate_k ({})",
                config.memory.top_k, config.memory.candidate_k
            ),
        });
    }

    if config.memory.max_chars == 0 {
        errors.push(ConfigError::Validation {
            message: "memory.max_chars must be greater than zero".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
