// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./braid.toml` > `~/.config/braid/braid.toml` > `/etc/braid/braid.toml`
//! with environment variable overrides via `BRAID_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::BraidConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/braid/braid.toml` (system-wide)
/// 3. `~/.config/braid/braid.toml` (user XDG config)
/// 4. `./braid.toml` (local directory)
/// 5. `BRAID_*` environment variables
pub fn load_config() -> Result<BraidConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BraidConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BraidConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BraidConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BraidConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BraidConfig::default()))
        .merge(Toml::file("/etc/braid/braid.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("braid/braid.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("braid.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `BRAID_RUNTIME_CHAT_MODEL` must map to
/// `runtime.chat_model`, not `runtime.chat.model`.
fn env_provider() -> Env {
    Env::prefixed("BRAID_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("runtime_", "runtime.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("storage_", "storage.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_from_empty_toml() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.name, "braid");
        assert_eq!(config.runtime.base_url, "http://127.0.0.1:11434");
        assert!(config.memory.enabled);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[runtime]
chat_model = "mistral:7b"
temperature = 0.2

[memory]
match_threshold = 0.6
"#,
        )
        .unwrap();
        assert_eq!(config.runtime.chat_model, "mistral:7b");
        assert!((config.runtime.temperature - 0.2).abs() < f64::EPSILON);
        assert!((config.memory.match_threshold - 0.6).abs() < f64::EPSILON);
        // Untouched sections keep defaults.
        assert_eq!(config.runtime.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[runtime]
chat_modle = "typo"
"#,
        );
        assert!(result.is_err());
    }
}
