// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The streaming session controller.
//!
//! Drives one response generation against the inference endpoint:
//! classifies each incoming token as thinking or answer content, runs the
//! bounded tool-call loop, recovers once from the narrow transient
//! model-load fault, and honors cooperative cancellation. Progress is
//! published as [`SessionEvent`]s; the finished [`AssistantTurn`] is the
//! return value.

use std::sync::Arc;
use std::time::Duration;

use braid_conversation::ToolCallRecord;
use braid_core::{BraidError, ChatMessage, RuntimeLifecycle, TokenUsage, ToolExecutor, ToolOutcome};
use braid_ollama::{is_transient_load_fault, ChatRequest, GenerationOptions, OllamaClient};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::{AssistantTurn, EventSink, SessionEvent, SessionOutcome, SessionPhase};
use crate::tooling::{recognize_tool_call, tool_result_message};

/// Per-run parameters for one response generation.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub model: String,
    pub temperature: Option<f64>,
    /// Upper bound on tool round-trips; `0` disables tool execution even
    /// when the model requests one.
    pub max_tool_turns: u32,
    /// When set, the thinking section is never closed by answer tokens
    /// (the user pinned it open).
    pub keep_thinking_open: bool,
}

/// Drives streaming response generations. One instance is shared by every
/// conversation; concurrency is bounded by the orchestrator, not here.
pub struct SessionController {
    client: Arc<OllamaClient>,
    tools: Arc<dyn ToolExecutor>,
    lifecycle: Arc<dyn RuntimeLifecycle>,
    retry_backoff: Duration,
}

fn emit(events: &EventSink, event: SessionEvent) {
    // A dropped receiver must never fail the session.
    let _ = events.send(event);
}

impl SessionController {
    pub fn new(
        client: Arc<OllamaClient>,
        tools: Arc<dyn ToolExecutor>,
        lifecycle: Arc<dyn RuntimeLifecycle>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            client,
            tools,
            lifecycle,
            retry_backoff,
        }
    }

    /// Runs one response generation over `messages`.
    ///
    /// On the transient model-load fault the entire tool-call loop restarts
    /// from the top, once per run, after asking the lifecycle collaborator
    /// to bring the server back. Any other failure propagates. Cancellation
    /// yields `Ok(SessionOutcome::Aborted)` with the partial turn.
    pub async fn run(
        &self,
        messages: &[ChatMessage],
        opts: &SessionOptions,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> Result<SessionOutcome, BraidError> {
        let mut recovered = false;

        loop {
            match self.run_tool_loop(messages, opts, cancel, events).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    let transient = matches!(
                        &e,
                        BraidError::Provider { message, .. } if is_transient_load_fault(message)
                    );
                    if transient && !recovered && !cancel.is_cancelled() {
                        recovered = true;
                        warn!(error = %e, "transient model-load fault, restarting session");
                        self.lifecycle.ensure_server_ready().await?;
                        tokio::time::sleep(self.retry_backoff).await;
                        continue;
                    }
                    emit(events, SessionEvent::Phase(SessionPhase::Failed));
                    return Err(e);
                }
            }
        }
    }

    /// One pass of the tool-call loop: stream, classify, possibly execute a
    /// tool and restart the stream with the augmented message list.
    async fn run_tool_loop(
        &self,
        base: &[ChatMessage],
        opts: &SessionOptions,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> Result<SessionOutcome, BraidError> {
        let mut working = base.to_vec();
        let mut tool_turns: u32 = 0;
        let mut trace: Vec<ToolCallRecord> = Vec::new();

        loop {
            if cancel.is_cancelled() {
                return Ok(self.aborted(String::new(), None, trace, None, events));
            }

            let request = ChatRequest {
                model: opts.model.clone(),
                messages: working.clone(),
                stream: true,
                options: Some(GenerationOptions {
                    temperature: opts.temperature,
                }),
            };

            let mut stream = tokio::select! {
                _ = cancel.cancelled() => {
                    return Ok(self.aborted(String::new(), None, trace, None, events));
                }
                result = self.client.chat_stream(&request) => result?,
            };

            let mut content = String::new();
            let mut thinking = String::new();
            let mut thinking_closed = false;
            let mut usage: Option<TokenUsage> = None;
            let mut phase = SessionPhase::Idle;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        // Partial output is retained, not discarded.
                        let thinking = (!thinking.is_empty()).then_some(thinking);
                        return Ok(self.aborted(content, thinking, trace, usage, events));
                    }
                    item = stream.next() => match item {
                        None => break,
                        Some(Err(e)) => return Err(e),
                        Some(Ok(chunk)) => {
                            if let Some(message) = chunk.message {
                                if let Some(delta) = message.thinking {
                                    if !delta.is_empty() {
                                        if phase != SessionPhase::Thinking {
                                            phase = SessionPhase::Thinking;
                                            emit(events, SessionEvent::Phase(phase));
                                        }
                                        thinking.push_str(&delta);
                                        emit(events, SessionEvent::ThinkingDelta(delta));
                                    }
                                }
                                if let Some(delta) = message.content {
                                    if !delta.is_empty() {
                                        // The first answer token closes the
                                        // thinking section unless pinned open.
                                        if !thinking.is_empty()
                                            && !thinking_closed
                                            && !opts.keep_thinking_open
                                        {
                                            thinking_closed = true;
                                            emit(events, SessionEvent::ThinkingClosed);
                                        }
                                        if phase != SessionPhase::Answering {
                                            phase = SessionPhase::Answering;
                                            emit(events, SessionEvent::Phase(phase));
                                        }
                                        content.push_str(&delta);
                                        emit(events, SessionEvent::AnswerDelta(delta));
                                    }
                                }
                            }
                            if chunk.done {
                                if chunk.prompt_eval_count.is_some() || chunk.eval_count.is_some() {
                                    let counts = TokenUsage {
                                        prompt_tokens: chunk.prompt_eval_count.unwrap_or(0),
                                        completion_tokens: chunk.eval_count.unwrap_or(0),
                                    };
                                    usage = Some(counts);
                                    emit(events, SessionEvent::Usage(counts));
                                }
                                break;
                            }
                        }
                    }
                }
            }

            // Stream complete: does the answer carry a tool call?
            match recognize_tool_call(&content, self.tools.as_ref()) {
                Some(call) if tool_turns < opts.max_tool_turns => {
                    emit(events, SessionEvent::Phase(SessionPhase::ToolExecuting));
                    emit(
                        events,
                        SessionEvent::ToolStarted {
                            tool: call.title.clone(),
                        },
                    );

                    let outcome = match self.tools.execute(&call.title, &call.arguments).await {
                        Ok(outcome) => outcome,
                        // A failing tool feeds its error back to the model
                        // instead of killing the session.
                        Err(e) => ToolOutcome::failed(e.to_string()),
                    };

                    emit(
                        events,
                        SessionEvent::ToolFinished {
                            tool: call.title.clone(),
                            success: outcome.success,
                        },
                    );
                    debug!(tool = %call.title, success = outcome.success, "tool executed");

                    // Feed the raw call and its result back, then restart the
                    // stream. The visible content/thinking reset with the
                    // next pass.
                    working.push(ChatMessage::assistant(content));
                    working.push(tool_result_message(&call, &outcome));
                    trace.push(ToolCallRecord {
                        tool: call.title,
                        arguments: call.arguments,
                        output: outcome.message,
                    });
                    tool_turns += 1;
                }
                _ => {
                    emit(events, SessionEvent::Phase(SessionPhase::Done));
                    return Ok(SessionOutcome::Done(AssistantTurn {
                        content,
                        thinking: (!thinking.is_empty()).then_some(thinking),
                        tool_trace: trace,
                        usage,
                    }));
                }
            }
        }
    }

    fn aborted(
        &self,
        content: String,
        thinking: Option<String>,
        trace: Vec<ToolCallRecord>,
        usage: Option<TokenUsage>,
        events: &EventSink,
    ) -> SessionOutcome {
        emit(events, SessionEvent::Phase(SessionPhase::Aborted));
        SessionOutcome::Aborted(AssistantTurn {
            content,
            thinking,
            tool_trace: trace,
            usage,
        })
    }
}
