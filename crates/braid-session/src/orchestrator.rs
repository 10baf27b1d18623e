// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The orchestrator: thin glue from a user turn to the engine.
//!
//! On submit: append the user message to the active branch, prepend a
//! freshly retrieved memory block to the system prompt, drive the session
//! controller, and on success enqueue a memory-editor job carrying the
//! memories retrieved for this turn. At most one session per conversation
//! may be open; a second submit is refused while one is outstanding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use braid_config::BraidConfig;
use braid_conversation::{Conversation, StoredMessage};
use braid_core::{BraidError, ChatMessage, ChatRole};
use braid_memory::{Memory, MemoryEditJob, MemoryEditor, MemoryRetriever};
use braid_ollama::OllamaClient;
use braid_storage::ConversationStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::controller::{SessionController, SessionOptions};
use crate::events::{EventSink, SessionOutcome};

/// Trimmed-history bound: how many trailing conversation messages are sent
/// to the model.
const MAX_HISTORY_MESSAGES: usize = 64;

/// The memory subsystem handles the orchestrator coordinates.
pub struct MemoryHandles {
    pub retriever: Arc<MemoryRetriever>,
    pub editor: MemoryEditor,
}

/// Settings the orchestrator needs per turn, distilled from [`BraidConfig`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub chat_model: String,
    pub editor_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub max_tool_turns: u32,
    pub system_prompt: String,
    pub memory_enabled: bool,
}

impl OrchestratorConfig {
    pub fn from_config(config: &BraidConfig) -> Self {
        Self {
            chat_model: config.runtime.chat_model.clone(),
            editor_model: config
                .memory
                .editor_model
                .clone()
                .unwrap_or_else(|| config.runtime.chat_model.clone()),
            embedding_model: config.runtime.embedding_model.clone(),
            temperature: config.runtime.temperature,
            max_tool_turns: config.runtime.max_tool_turns,
            system_prompt: config.engine.system_prompt.clone().unwrap_or_else(|| {
                format!(
                    "You are {}, a helpful assistant running locally on this computer.",
                    config.engine.name
                )
            }),
            memory_enabled: config.memory.enabled,
        }
    }
}

/// Wires user turns to the session controller, the conversation store, and
/// the memory subsystem.
pub struct Orchestrator {
    client: Arc<OllamaClient>,
    controller: SessionController,
    store: Arc<dyn ConversationStore>,
    memory: Option<MemoryHandles>,
    config: OrchestratorConfig,
    /// Conversations with an open session. Guards the one-session-per-
    /// conversation invariant.
    active: StdMutex<HashSet<String>>,
}

/// Releases the conversation's session slot on drop, on every exit path.
#[derive(Debug)]
struct TurnGuard<'a> {
    active: &'a StdMutex<HashSet<String>>,
    id: String,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.active.lock() {
            set.remove(&self.id);
        }
    }
}

impl Orchestrator {
    pub fn new(
        client: Arc<OllamaClient>,
        controller: SessionController,
        store: Arc<dyn ConversationStore>,
        memory: Option<MemoryHandles>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            client,
            controller,
            store,
            memory,
            config,
            active: StdMutex::new(HashSet::new()),
        }
    }

    /// Claims the conversation's single session slot.
    fn claim<'a>(&'a self, conversation_id: &str) -> Result<TurnGuard<'a>, BraidError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| BraidError::Internal("session registry poisoned".into()))?;
        if !active.insert(conversation_id.to_string()) {
            return Err(BraidError::Internal(
                "a response is already streaming for this conversation".into(),
            ));
        }
        Ok(TurnGuard {
            active: &self.active,
            id: conversation_id.to_string(),
        })
    }

    fn memory_if_enabled(&self) -> Option<&MemoryHandles> {
        if self.config.memory_enabled {
            self.memory.as_ref()
        } else {
            None
        }
    }

    /// Persists every mutation that should survive a restart. The temporary
    /// conversation is never written.
    async fn persist(&self, conversation: &Conversation) -> Result<(), BraidError> {
        if conversation.is_temporary {
            return Ok(());
        }
        self.store.put(conversation).await
    }

    fn build_messages(
        &self,
        conversation: &Conversation,
        system_prompt: &str,
    ) -> Vec<ChatMessage> {
        let history = conversation.messages();
        let start = history.len().saturating_sub(MAX_HISTORY_MESSAGES);

        let mut messages = vec![ChatMessage::system(system_prompt)];
        for message in &history[start..] {
            if message.content.is_empty() {
                continue;
            }
            messages.push(ChatMessage {
                role: message.role,
                content: message.content.clone(),
            });
        }
        messages
    }

    /// Handles one user submit end to end.
    ///
    /// On `Done` the assistant message is appended and persisted and a
    /// memory-editor job is enqueued. On `Aborted` the partial assistant
    /// message is kept and no job runs. On a hard failure the conversation
    /// reverts to its pre-turn state on disk and the error propagates.
    pub async fn submit(
        &self,
        conversation: &mut Conversation,
        user_message: StoredMessage,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> Result<SessionOutcome, BraidError> {
        if user_message.role != ChatRole::User {
            return Err(BraidError::Internal(
                "submit requires a user message".into(),
            ));
        }

        let _guard = self.claim(&conversation.id)?;

        let branch_id = conversation.active_branch().id.clone();
        let pre_turn_len = conversation.messages().len();
        let user_text = user_message.content.clone();

        conversation.append_message(user_message);
        self.persist(conversation).await?;

        // Memory retrieval is best-effort: any failure degrades to a plain
        // conversation, never a failed turn.
        let mut system_prompt = self.config.system_prompt.clone();
        let mut retrieved: Vec<Memory> = Vec::new();
        if let Some(memory) = self.memory_if_enabled() {
            match self
                .client
                .embed(&self.config.embedding_model, &user_text)
                .await
            {
                Ok(embedding) => match memory.retriever.retrieve(&embedding).await {
                    Ok(result) if result.count > 0 => {
                        debug!(count = result.count, chars = result.used_chars, "memories retrieved");
                        let ids: Vec<String> =
                            result.memories.iter().map(|m| m.id.clone()).collect();
                        memory.retriever.touch_retrieved(&ids).await;
                        system_prompt = format!("{system_prompt}\n\n{}", result.text);
                        retrieved = result.memories;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "memory retrieval failed, continuing without"),
                },
                Err(e) => warn!(error = %e, "query embedding failed, continuing without memories"),
            }
            memory.retriever.maybe_purge_stale().await;
        }

        let messages = self.build_messages(conversation, &system_prompt);
        let opts = SessionOptions {
            model: self.config.chat_model.clone(),
            temperature: Some(self.config.temperature),
            max_tool_turns: self.config.max_tool_turns,
            keep_thinking_open: false,
        };

        match self.controller.run(&messages, &opts, cancel, events).await {
            Ok(outcome) => {
                let turn = outcome.turn();
                let mut assistant = StoredMessage::assistant(turn.content.clone());
                assistant.thinking = turn.thinking.clone();
                assistant.tool_trace = turn.tool_trace.clone();
                conversation.append_message(assistant);
                self.persist(conversation).await?;

                if !outcome.is_aborted() && !conversation.is_temporary {
                    if let Some(memory) = self.memory_if_enabled() {
                        memory
                            .editor
                            .enqueue(MemoryEditJob {
                                model: self.config.editor_model.clone(),
                                // Skip the leading system message; the editor
                                // sees the exchange, not the prompt plumbing.
                                history: messages[1..].to_vec(),
                                assistant_reply: turn.content.clone(),
                                retrieved,
                            })
                            .await;
                    }
                }

                Ok(outcome)
            }
            Err(e) => {
                // Hard failure: discard the turn and re-persist the pre-turn
                // state.
                if let Some(branch) = conversation
                    .branches
                    .iter_mut()
                    .find(|b| b.id == branch_id)
                {
                    branch.messages.truncate(pre_turn_len);
                }
                if let Err(persist_err) = self.persist(conversation).await {
                    warn!(error = %persist_err, "failed to persist pre-turn rollback");
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use braid_memory::{MemoryStore, RetrievalParams, SqliteMemoryStore};
    use braid_storage::SqliteConversationStore;
    use braid_test_utils::{ndjson, MockLifecycle, MockToolExecutor};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Harness {
        server: MockServer,
        orchestrator: Orchestrator,
        memory_store: Arc<SqliteMemoryStore>,
    }

    async fn harness(memory_enabled: bool) -> Harness {
        let server = MockServer::start().await;
        let client = Arc::new(OllamaClient::new(server.uri(), 10).unwrap());

        let controller = SessionController::new(
            client.clone(),
            Arc::new(MockToolExecutor::disabled()),
            Arc::new(MockLifecycle::new()),
            Duration::from_millis(10),
        );

        let memory_store = Arc::new(SqliteMemoryStore::open_in_memory().await.unwrap());
        let store_dyn: Arc<dyn MemoryStore> = memory_store.clone();
        let retriever = Arc::new(MemoryRetriever::new(
            store_dyn.clone(),
            RetrievalParams {
                candidate_k: 8,
                top_k: 4,
                min_score: 0.35,
                max_chars: 1000,
            },
            90,
            6,
        ));
        let editor = MemoryEditor::new(client.clone(), store_dyn, "embed-model", 0.45);

        let conversation_store: Arc<dyn ConversationStore> =
            Arc::new(SqliteConversationStore::open_in_memory().await.unwrap());

        let config = OrchestratorConfig {
            chat_model: "llama3.1:8b".into(),
            editor_model: "llama3.1:8b".into(),
            embedding_model: "embed-model".into(),
            temperature: 0.7,
            max_tool_turns: 4,
            system_prompt: "You are a test assistant.".into(),
            memory_enabled,
        };

        let orchestrator = Orchestrator::new(
            client,
            controller,
            conversation_store,
            Some(MemoryHandles { retriever, editor }),
            config,
        );

        Harness {
            server,
            orchestrator,
            memory_store,
        }
    }

    fn sink() -> EventSink {
        mpsc::unbounded_channel().0
    }

    async fn mount_embeddings(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [1.0, 0.0]
            })))
            .mount(server)
            .await;
    }

    async fn chat_requests(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/api/chat")
            .count()
    }

    #[tokio::test]
    async fn hello_round_trip_on_temporary_conversation_runs_no_editor() {
        let h = harness(true).await;
        mount_embeddings(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("Hi")))
            .mount(&h.server)
            .await;

        let mut conv = Conversation::new_temporary();
        let outcome = h
            .orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("Hello"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap();

        assert!(!outcome.is_aborted());
        assert_eq!(conv.messages().len(), 2);
        assert_eq!(conv.messages()[0].content, "Hello");
        assert_eq!(conv.messages()[1].content, "Hi");
        assert!(conv.messages()[1].is_done);

        // Give a would-be editor job time to fire, then confirm the chat
        // endpoint saw only the session request.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(chat_requests(&h.server).await, 1);
    }

    #[tokio::test]
    async fn successful_turn_persists_and_enqueues_editor_job() {
        let h = harness(true).await;
        mount_embeddings(&h.server).await;
        // The editor's request is distinguishable by its prompt preamble.
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_string_contains("long-term memory store"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(ndjson::simple_body(r#"{"actions": []}"#)),
            )
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("Sure!")))
            .mount(&h.server)
            .await;

        let mut conv = Conversation::new("persisted chat");
        h.orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("remember that I like tea"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap();

        // The conversation reached the store with both messages.
        let stored = h.orchestrator.store.get(&conv.id).await.unwrap().unwrap();
        assert_eq!(stored.messages().len(), 2);

        // The editor job ran against the chat endpoint.
        for _ in 0..100 {
            if chat_requests(&h.server).await >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(chat_requests(&h.server).await, 2);
    }

    #[tokio::test]
    async fn memory_disabled_makes_no_embedding_or_editor_calls() {
        let h = harness(false).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("Hi")))
            .mount(&h.server)
            .await;

        let mut conv = Conversation::new("plain");
        h.orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("Hello"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let requests = h.server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| r.url.path() == "/api/chat"));
        assert_eq!(requests.len(), 1);
    }

    #[tokio::test]
    async fn retrieved_memories_are_prepended_to_the_system_prompt() {
        let h = harness(true).await;
        mount_embeddings(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("Hi")))
            .mount(&h.server)
            .await;

        // A memory aligned with the mocked query embedding.
        let mut memory = braid_memory::Memory::new("the user drinks oolong", vec![1.0, 0.0]);
        memory.id = "mem-1".into();
        h.memory_store.save(&memory).await.unwrap();

        let mut conv = Conversation::new_temporary();
        h.orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("what tea do I like?"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap();

        let requests = h.server.received_requests().await.unwrap();
        let chat = requests
            .iter()
            .find(|r| r.url.path() == "/api/chat")
            .unwrap();
        let body = String::from_utf8_lossy(&chat.body);
        assert!(body.contains("Relevant memories:"));
        assert!(body.contains("the user drinks oolong"));

        // Retrieval stamped the memory.
        let stamped = h.memory_store.get("mem-1").await.unwrap().unwrap();
        assert!(stamped.last_retrieved_at.is_some());
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_plain_conversation() {
        let h = harness(true).await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"error":"embedder down"}"#))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("Hi")))
            .mount(&h.server)
            .await;

        let mut conv = Conversation::new_temporary();
        let outcome = h
            .orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("Hello"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.turn().content, "Hi");
    }

    #[tokio::test]
    async fn hard_failure_rolls_back_the_user_message_on_disk() {
        let h = harness(false).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"error":"model not found"}"#),
            )
            .mount(&h.server)
            .await;

        let mut conv = Conversation::new("doomed");
        // Seed a prior exchange so the pre-turn state is non-trivial.
        conv.append_message(StoredMessage::user("earlier"));
        conv.append_message(StoredMessage::assistant("reply"));
        h.orchestrator.store.put(&conv).await.unwrap();

        let err = h
            .orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("Hello"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));

        // In-memory and on-disk state both reverted to the pre-turn shape.
        assert_eq!(conv.messages().len(), 2);
        let stored = h.orchestrator.store.get(&conv.id).await.unwrap().unwrap();
        assert_eq!(stored.messages().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_turn_keeps_partial_and_skips_editor() {
        let h = harness(true).await;
        mount_embeddings(&h.server).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ndjson::simple_body("late")))
            .mount(&h.server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut conv = Conversation::new("paused");
        let outcome = h
            .orchestrator
            .submit(
                &mut conv,
                StoredMessage::user("Hello"),
                &cancel,
                &sink(),
            )
            .await
            .unwrap();

        assert!(outcome.is_aborted());
        // User message and (empty) partial assistant message retained.
        assert_eq!(conv.messages().len(), 2);
        assert!(conv.messages()[1].is_done);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(chat_requests(&h.server).await, 0);
    }

    #[tokio::test]
    async fn second_claim_for_same_conversation_is_refused() {
        let h = harness(false).await;
        let guard = h.orchestrator.claim("conv-1").unwrap();
        let err = h.orchestrator.claim("conv-1").unwrap_err();
        assert!(err.to_string().contains("already streaming"));

        // A different conversation streams independently.
        let other = h.orchestrator.claim("conv-2");
        assert!(other.is_ok());

        drop(guard);
        assert!(h.orchestrator.claim("conv-1").is_ok());
    }

    #[tokio::test]
    async fn non_user_message_is_rejected() {
        let h = harness(false).await;
        let mut conv = Conversation::new("typed");
        let err = h
            .orchestrator
            .submit(
                &mut conv,
                StoredMessage::assistant("not a user turn"),
                &CancellationToken::new(),
                &sink(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("user message"));
    }
}
