// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `braid doctor` command implementation.
//!
//! Probes the pieces a working installation needs: the inference runtime
//! answering its heartbeat, and the storage database opening.

use braid_config::BraidConfig;
use braid_core::BraidError;
use braid_ollama::OllamaClient;
use braid_storage::{ConversationStore, SqliteConversationStore};
use colored::Colorize;

fn report(label: &str, result: &Result<String, String>) {
    match result {
        Ok(detail) => println!("{} {label}: {detail}", "ok".green().bold()),
        Err(detail) => println!("{} {label}: {detail}", "fail".red().bold()),
    }
}

/// Runs the `braid doctor` environment probe.
pub async fn run_doctor(config: BraidConfig) -> Result<(), BraidError> {
    println!("{}\n", "braid doctor".bold());

    println!("chat model:      {}", config.runtime.chat_model);
    println!("embedding model: {}", config.runtime.embedding_model);
    println!("database:        {}\n", config.storage.database_path);

    let mut failures = 0;

    // Runtime reachability.
    let runtime = match OllamaClient::new(
        &config.runtime.base_url,
        config.runtime.request_timeout_secs,
    ) {
        Ok(client) => match client.heartbeat().await {
            Ok(()) => Ok(format!("answering at {}", config.runtime.base_url)),
            Err(e) => Err(e.to_string()),
        },
        Err(e) => Err(e.to_string()),
    };
    if runtime.is_err() {
        failures += 1;
    }
    report("runtime", &runtime);

    // Storage opens and lists.
    let storage = match SqliteConversationStore::open(
        &config.storage.database_path,
        config.storage.wal_mode,
    )
    .await
    {
        Ok(store) => match store.get_all().await {
            Ok(conversations) => Ok(format!("{} conversation(s)", conversations.len())),
            Err(e) => Err(e.to_string()),
        },
        Err(e) => Err(e.to_string()),
    };
    if storage.is_err() {
        failures += 1;
    }
    report("storage", &storage);

    if failures > 0 {
        println!();
        Err(BraidError::Internal(format!(
            "{failures} check(s) failed"
        )))
    } else {
        println!("\n{}", "all checks passed".green());
        Ok(())
    }
}
