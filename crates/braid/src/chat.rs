// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `braid chat` command implementation.
//!
//! Launches an interactive REPL with colored prompt, streaming output
//! (thinking rendered dim), and readline history. This is the CLI stand-in
//! for the desktop front-end; it drives the same orchestrator.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use braid_config::BraidConfig;
use braid_conversation::{Conversation, StoredMessage};
use braid_core::{BraidError, ToolExecutor, ToolOutcome};
use braid_memory::{
    MemoryEditor, MemoryRetriever, MemoryStore, RetrievalParams, SqliteMemoryStore,
};
use braid_ollama::{HeartbeatLifecycle, OllamaClient};
use braid_session::{
    MemoryHandles, Orchestrator, OrchestratorConfig, SessionController, SessionEvent,
};
use braid_storage::{ConversationStore, SqliteConversationStore};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Concrete tool implementations live outside the engine; the CLI ships
/// with an empty registry.
struct NoTools;

#[async_trait]
impl ToolExecutor for NoTools {
    fn is_enabled(&self, _tool_id: &str) -> bool {
        false
    }

    async fn execute(
        &self,
        tool_id: &str,
        _arguments: &serde_json::Value,
    ) -> Result<ToolOutcome, BraidError> {
        Err(BraidError::Tool {
            message: format!("no tool registered as `{tool_id}`"),
        })
    }
}

/// Builds the orchestrator stack from configuration.
async fn build_orchestrator(config: &BraidConfig) -> Result<Orchestrator, BraidError> {
    let client = Arc::new(OllamaClient::new(
        &config.runtime.base_url,
        config.runtime.request_timeout_secs,
    )?);

    let lifecycle = Arc::new(HeartbeatLifecycle::new(
        client.clone(),
        10,
        Duration::from_millis(500),
    ));

    let controller = SessionController::new(
        client.clone(),
        Arc::new(NoTools),
        lifecycle,
        Duration::from_millis(config.runtime.retry_backoff_ms),
    );

    let conversation_store: Arc<dyn ConversationStore> = Arc::new(
        SqliteConversationStore::open(
            &config.storage.database_path,
            config.storage.wal_mode,
        )
        .await?,
    );

    let memory = if config.memory.enabled {
        let store: Arc<dyn MemoryStore> =
            Arc::new(SqliteMemoryStore::open(&config.storage.database_path).await?);
        let retriever = Arc::new(MemoryRetriever::new(
            store.clone(),
            RetrievalParams {
                candidate_k: config.memory.candidate_k,
                top_k: config.memory.top_k,
                min_score: config.memory.min_score as f32,
                max_chars: config.memory.max_chars,
            },
            config.memory.retention_days,
            config.memory.purge_interval_hours,
        ));
        let editor = MemoryEditor::new(
            client.clone(),
            store,
            config.runtime.embedding_model.clone(),
            config.memory.match_threshold as f32,
        );
        Some(MemoryHandles { retriever, editor })
    } else {
        info!("memory system disabled by configuration");
        None
    };

    Ok(Orchestrator::new(
        client,
        controller,
        conversation_store,
        memory,
        OrchestratorConfig::from_config(config),
    ))
}

/// Runs the `braid chat` interactive REPL.
pub async fn run_chat(config: BraidConfig, temporary: bool) -> Result<(), BraidError> {
    let orchestrator = build_orchestrator(&config).await?;

    let mut conversation = if temporary {
        Conversation::new_temporary()
    } else {
        Conversation::new("New chat")
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| BraidError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "braid chat".bold().green());
    if temporary {
        println!("{}", "(temporary conversation, nothing is saved)".dimmed());
    }
    println!("Type {} to exit.\n", "/quit".yellow());

    let prompt = format!("{}> ", config.engine.name.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                // Title the conversation after its first message.
                if conversation.messages().is_empty() {
                    conversation.title = truncate_title(trimmed);
                }

                if let Err(e) = run_turn(&orchestrator, &mut conversation, trimmed).await {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "readline error".red());
                break;
            }
        }
    }

    Ok(())
}

/// Submits one user turn and streams the events to stdout.
async fn run_turn(
    orchestrator: &Orchestrator,
    conversation: &mut Conversation,
    text: &str,
) -> Result<(), BraidError> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let printer = tokio::spawn(async move {
        let mut in_thinking = false;
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::ThinkingDelta(delta) => {
                    in_thinking = true;
                    print!("{}", delta.dimmed());
                    let _ = std::io::stdout().flush();
                }
                SessionEvent::ThinkingClosed => {
                    if in_thinking {
                        println!();
                        in_thinking = false;
                    }
                }
                SessionEvent::AnswerDelta(delta) => {
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                }
                SessionEvent::ToolStarted { tool } => {
                    println!("{}", format!("[running tool: {tool}]").yellow());
                }
                _ => {}
            }
        }
    });

    let cancel = CancellationToken::new();
    let result = orchestrator
        .submit(conversation, StoredMessage::user(text), &cancel, &tx)
        .await;

    drop(tx);
    let _ = printer.await;
    println!();

    result.map(|_| ())
}

fn truncate_title(text: &str) -> String {
    const MAX_TITLE: usize = 48;
    if text.chars().count() <= MAX_TITLE {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_TITLE).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_truncation() {
        assert_eq!(truncate_title("short"), "short");
        let long = "x".repeat(100);
        let title = truncate_title(&long);
        assert_eq!(title.chars().count(), 49);
        assert!(title.ends_with('…'));
    }

    #[tokio::test]
    async fn no_tools_rejects_everything() {
        let tools = NoTools;
        assert!(!tools.is_enabled("read_file"));
        assert!(tools
            .execute("read_file", &serde_json::json!({}))
            .await
            .is_err());
    }
}
