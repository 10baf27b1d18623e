// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session phases, the incremental event stream, and the final turn value.
//!
//! The controller publishes deltas over a channel and returns the finished
//! turn; callers fold events into their own copy instead of observing
//! shared mutable state.

use braid_conversation::ToolCallRecord;
use braid_core::TokenUsage;
use tokio::sync::mpsc;

/// States of one response-generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    /// Streaming reasoning tokens.
    Thinking,
    /// Streaming answer tokens.
    Answering,
    /// A recognized tool call is executing.
    ToolExecuting,
    Done,
    Aborted,
    Failed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Thinking => write!(f, "thinking"),
            SessionPhase::Answering => write!(f, "answering"),
            SessionPhase::ToolExecuting => write!(f, "tool-executing"),
            SessionPhase::Done => write!(f, "done"),
            SessionPhase::Aborted => write!(f, "aborted"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Incremental updates published while a session runs.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Phase(SessionPhase),
    ThinkingDelta(String),
    /// The thinking section closed because the first answer token arrived.
    ThinkingClosed,
    AnswerDelta(String),
    /// A tool round-trip begins. The visible content/thinking reset here;
    /// callers folding deltas should clear their accumulated copy.
    ToolStarted { tool: String },
    ToolFinished { tool: String, success: bool },
    Usage(TokenUsage),
}

/// Where the controller publishes [`SessionEvent`]s. A dropped receiver is
/// harmless; sends are fire-and-forget.
pub type EventSink = mpsc::UnboundedSender<SessionEvent>;

/// The accumulated result of one response generation.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub thinking: Option<String>,
    pub tool_trace: Vec<ToolCallRecord>,
    pub usage: Option<TokenUsage>,
}

/// How a session ended. Cancellation is not a failure: the partial turn is
/// retained. Hard failures are `Err(BraidError)` instead.
#[derive(Debug)]
pub enum SessionOutcome {
    Done(AssistantTurn),
    Aborted(AssistantTurn),
}

impl SessionOutcome {
    pub fn turn(&self) -> &AssistantTurn {
        match self {
            SessionOutcome::Done(turn) | SessionOutcome::Aborted(turn) => turn,
        }
    }

    pub fn into_turn(self) -> AssistantTurn {
        match self {
            SessionOutcome::Done(turn) | SessionOutcome::Aborted(turn) => turn,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionOutcome::Aborted(_))
    }
}
