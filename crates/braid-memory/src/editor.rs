// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory editor agent: a queued, coalescing background worker.
//!
//! After each completed exchange the orchestrator enqueues a job carrying
//! the exchange and the memories that were retrieved for it. The agent asks
//! the model for a single JSON object describing create/update/delete
//! actions and applies them. The queue has depth one: a newly enqueued job
//! replaces any not-yet-started job, never the running one. The caller is
//! responsible for never enqueueing jobs for the temporary conversation or
//! when memory updates are disabled.

use std::sync::Arc;

use braid_core::{extract_first_balanced_object, BraidError, ChatMessage};
use braid_ollama::{ChatRequest, OllamaClient};
use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::matcher::resolve_reference;
use crate::store::MemoryStore;
use crate::types::{Memory, MemoryAction};

/// Instructions for the editor model. The exchange and retrieved memories
/// are substituted into the placeholders.
const EDITOR_PROMPT: &str = r#"You maintain a long-term memory store of durable facts about the user.

Given the conversation below and the memories that were shown for it, decide whether the store needs changes. Reply with exactly one JSON object on a single line:

{"actions": [{"type": "create", "text": "..."}, {"type": "update", "match": "<existing memory text>", "text": "..."}, {"type": "delete", "match": "<existing memory text>"}]}

Rules:
- Only record durable facts about the user, stated by the user.
- Use "update" when a shown memory is outdated, "delete" when it is wrong.
- If nothing should change, reply {"actions": []}.

Memories shown for this exchange:
{memories}

Conversation:
{conversation}

Assistant reply:
{reply}

JSON only, no explanation:"#;

/// One unit of work for the editor agent.
#[derive(Debug, Clone)]
pub struct MemoryEditJob {
    /// Model to run the edit pass with.
    pub model: String,
    /// Snapshot of the conversation at enqueue time.
    pub history: Vec<ChatMessage>,
    /// The assistant reply that completed the exchange.
    pub assistant_reply: String,
    /// The memories retrieved for this exchange; fuzzy references resolve
    /// against these.
    pub retrieved: Vec<Memory>,
}

struct EditorState {
    queued: Option<MemoryEditJob>,
    running: bool,
    cancel: Option<CancellationToken>,
}

struct EditorInner {
    client: Arc<OllamaClient>,
    store: Arc<dyn MemoryStore>,
    embedding_model: String,
    match_threshold: f32,
    state: Mutex<EditorState>,
}

/// Single-worker coalescing queue around the edit pass.
#[derive(Clone)]
pub struct MemoryEditor {
    inner: Arc<EditorInner>,
}

impl MemoryEditor {
    pub fn new(
        client: Arc<OllamaClient>,
        store: Arc<dyn MemoryStore>,
        embedding_model: impl Into<String>,
        match_threshold: f32,
    ) -> Self {
        Self {
            inner: Arc::new(EditorInner {
                client,
                store,
                embedding_model: embedding_model.into(),
                match_threshold,
                state: Mutex::new(EditorState {
                    queued: None,
                    running: false,
                    cancel: None,
                }),
            }),
        }
    }

    /// Queues a job, replacing any job that has not started yet, and wakes
    /// the worker if it is idle. The newest job's context supersedes older
    /// queued context.
    pub async fn enqueue(&self, job: MemoryEditJob) {
        let mut state = self.inner.state.lock().await;
        state.queued = Some(job);
        if !state.running {
            state.running = true;
            let inner = Arc::clone(&self.inner);
            tokio::spawn(drain(inner));
        }
    }

    /// Aborts the in-flight edit (if any) and drops the queued job.
    pub async fn skip(&self) {
        let mut state = self.inner.state.lock().await;
        state.queued = None;
        if let Some(cancel) = &state.cancel {
            cancel.cancel();
        }
    }

    /// Whether the worker has nothing running and nothing queued.
    pub async fn is_idle(&self) -> bool {
        let state = self.inner.state.lock().await;
        !state.running && state.queued.is_none()
    }
}

/// Worker loop: drains jobs strictly in enqueue order until the slot is
/// empty, then parks.
async fn drain(inner: Arc<EditorInner>) {
    loop {
        let (job, cancel) = {
            let mut state = inner.state.lock().await;
            match state.queued.take() {
                Some(job) => {
                    let cancel = CancellationToken::new();
                    state.cancel = Some(cancel.clone());
                    (job, cancel)
                }
                None => {
                    state.running = false;
                    state.cancel = None;
                    return;
                }
            }
        };

        if let Err(e) = run_job(&inner, job, &cancel).await {
            warn!(error = %e, "memory edit job failed");
        }
    }
}

/// Runs one edit pass: ask the model for actions, parse, resolve, apply.
async fn run_job(
    inner: &EditorInner,
    job: MemoryEditJob,
    cancel: &CancellationToken,
) -> Result<(), BraidError> {
    let request = ChatRequest {
        model: job.model.clone(),
        messages: vec![ChatMessage::user(build_editor_prompt(&job))],
        stream: true,
        options: None,
    };

    let mut stream = tokio::select! {
        _ = cancel.cancelled() => {
            debug!("memory edit job skipped before start");
            return Ok(());
        }
        result = inner.client.chat_stream(&request) => result?,
    };

    let mut answer = String::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("memory edit job skipped mid-stream");
                return Ok(());
            }
            item = stream.next() => match item {
                None => break,
                Some(Err(e)) => return Err(e),
                Some(Ok(chunk)) => {
                    // Thinking tokens are suppressed; only answer text counts.
                    if let Some(message) = chunk.message {
                        if let Some(content) = message.content {
                            answer.push_str(&content);
                        }
                    }
                    if chunk.done {
                        break;
                    }
                }
            }
        }
    }

    let actions = parse_editor_response(&answer);
    debug!(count = actions.len(), "memory editor proposed actions");
    apply_actions(inner, &actions, &job.retrieved).await;
    Ok(())
}

fn build_editor_prompt(job: &MemoryEditJob) -> String {
    let memories = if job.retrieved.is_empty() {
        "(none)".to_string()
    } else {
        job.retrieved
            .iter()
            .map(|m| format!("- {}", m.text))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let conversation = job
        .history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    EDITOR_PROMPT
        .replace("{memories}", &memories)
        .replace("{conversation}", &conversation)
        .replace("{reply}", &job.assistant_reply)
}

/// Extracts the first balanced JSON object from the model's answer and
/// normalizes it against the accepted shapes: `{actions: [...]}` or
/// `{create: [...], update: [...], delete: [...]}` (items may be bare
/// strings where only text is needed). Unknown shapes yield an empty list.
pub fn parse_editor_response(text: &str) -> Vec<MemoryAction> {
    let Some(value) = extract_first_balanced_object(text) else {
        return Vec::new();
    };

    if let Some(actions) = value.get("actions").and_then(Value::as_array) {
        return actions
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect();
    }

    let grouped = ["create", "update", "delete"]
        .iter()
        .any(|key| value.get(*key).is_some());
    if !grouped {
        return Vec::new();
    }

    let mut out = Vec::new();

    if let Some(items) = value.get("create").and_then(Value::as_array) {
        for item in items {
            match item {
                Value::String(text) => out.push(MemoryAction::Create { text: text.clone() }),
                Value::Object(obj) => {
                    if let Some(text) = obj.get("text").and_then(Value::as_str) {
                        out.push(MemoryAction::Create {
                            text: text.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(items) = value.get("update").and_then(Value::as_array) {
        for obj in items.iter().filter_map(Value::as_object) {
            let Some(text) = obj.get("text").and_then(Value::as_str) else {
                continue;
            };
            out.push(MemoryAction::Update {
                id: obj.get("id").and_then(Value::as_str).map(str::to_string),
                match_text: obj.get("match").and_then(Value::as_str).map(str::to_string),
                text: text.to_string(),
            });
        }
    }

    if let Some(items) = value.get("delete").and_then(Value::as_array) {
        for item in items {
            match item {
                Value::String(reference) => out.push(MemoryAction::Delete {
                    id: None,
                    match_text: Some(reference.clone()),
                }),
                Value::Object(obj) => {
                    let id = obj.get("id").and_then(Value::as_str).map(str::to_string);
                    let match_text =
                        obj.get("match").and_then(Value::as_str).map(str::to_string);
                    if id.is_some() || match_text.is_some() {
                        out.push(MemoryAction::Delete { id, match_text });
                    }
                }
                _ => {}
            }
        }
    }

    out
}

/// Applies actions in order. Failures on one action are logged and do not
/// abort the rest.
async fn apply_actions(inner: &EditorInner, actions: &[MemoryAction], retrieved: &[Memory]) {
    for action in actions {
        if let Err(e) = apply_action(inner, action, retrieved).await {
            warn!(error = %e, "memory action failed, continuing");
        }
    }
}

async fn apply_action(
    inner: &EditorInner,
    action: &MemoryAction,
    retrieved: &[Memory],
) -> Result<(), BraidError> {
    match action {
        MemoryAction::Create { text } => {
            let embedding = inner.client.embed(&inner.embedding_model, text).await?;
            inner.store.save(&Memory::new(text.clone(), embedding)).await
        }
        MemoryAction::Update {
            id,
            match_text,
            text,
        } => {
            let Some(id) = resolve_target(id, match_text, retrieved, inner.match_threshold)
            else {
                debug!("unresolved update reference, skipping action");
                return Ok(());
            };
            let embedding = inner.client.embed(&inner.embedding_model, text).await?;
            inner
                .store
                .update_text(&id, text, &embedding, Utc::now())
                .await
        }
        MemoryAction::Delete { id, match_text } => {
            let Some(id) = resolve_target(id, match_text, retrieved, inner.match_threshold)
            else {
                debug!("unresolved delete reference, skipping action");
                return Ok(());
            };
            inner.store.delete(&id).await
        }
    }
}

/// An explicit id wins; otherwise the `match` reference resolves fuzzily
/// against the job's retrieved memories.
fn resolve_target(
    id: &Option<String>,
    match_text: &Option<String>,
    retrieved: &[Memory],
    threshold: f32,
) -> Option<String> {
    if let Some(id) = id {
        if !id.is_empty() {
            return Some(id.clone());
        }
    }
    match_text
        .as_deref()
        .and_then(|reference| resolve_reference(reference, retrieved, threshold))
}
