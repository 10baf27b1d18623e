// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Braid engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Braid configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BraidConfig {
    /// Engine identity and logging settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Local inference runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Long-term memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Conversation storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Engine identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Display name of the engine.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// System prompt prepended to every conversation. `None` uses the
    /// built-in default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_engine_name() -> String {
    "braid".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Local inference runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Base URL of the local inference server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for chat completions.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Model used for embedding requests.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Sampling temperature for chat completions.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tool round-trips per response generation.
    #[serde(default = "default_max_tool_turns")]
    pub max_tool_turns: u32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Back-off delay before restarting the loop after a transient
    /// model-load fault, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
            max_tool_turns: default_max_tool_turns(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_chat_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tool_turns() -> u32 {
    4
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_retry_backoff_ms() -> u64 {
    1500
}

/// Long-term memory configuration.
///
/// Controls retrieval budgets, the editor agent, and stale-memory pruning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Enable the memory system. When false, no memory operations occur.
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,

    /// Number of scored candidates kept before the final top-k cap.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,

    /// Maximum number of memories rendered into one prompt block.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum cosine similarity for a memory to be considered (0.0-1.0).
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Character budget for the rendered memory block.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Minimum fuzzy-match score for resolving an editor action's text
    /// reference to a stored memory (0.0-1.0).
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Memories not retrieved for this many days are pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Minimum hours between stale-memory pruning passes.
    #[serde(default = "default_purge_interval_hours")]
    pub purge_interval_hours: u32,

    /// Model used by the memory editor agent. `None` uses the chat model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_model: Option<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            candidate_k: default_candidate_k(),
            top_k: default_top_k(),
            min_score: default_min_score(),
            max_chars: default_max_chars(),
            match_threshold: default_match_threshold(),
            retention_days: default_retention_days(),
            purge_interval_hours: default_purge_interval_hours(),
            editor_model: None,
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_candidate_k() -> usize {
    24
}

fn default_top_k() -> usize {
    6
}

fn default_min_score() -> f64 {
    0.35
}

fn default_max_chars() -> usize {
    2000
}

fn default_match_threshold() -> f64 {
    0.45
}

fn default_retention_days() -> u32 {
    90
}

fn default_purge_interval_hours() -> u32 {
    6
}

/// Conversation storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("braid").join("braid.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("braid.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
