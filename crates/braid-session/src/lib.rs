// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response generation for the Braid engine.
//!
//! [`SessionController`] drives one streaming completion: thinking/answer
//! token multiplexing, the bounded tool-call loop, single-shot transient
//! recovery, and cooperative cancellation. [`Orchestrator`] is the thin
//! glue from a user turn to the controller, the conversation store, and
//! the memory subsystem.

pub mod controller;
pub mod events;
pub mod orchestrator;
pub mod tooling;

pub use controller::{SessionController, SessionOptions};
pub use events::{AssistantTurn, EventSink, SessionEvent, SessionOutcome, SessionPhase};
pub use orchestrator::{MemoryHandles, Orchestrator, OrchestratorConfig};
pub use tooling::{recognize_tool_call, ToolCall};
