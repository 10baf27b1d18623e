// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Branching conversation history for the Braid engine.
//!
//! A conversation owns a set of branches -- independent, ordered message
//! arrays sharing a prefix up to their fork point -- and the id of the
//! currently active one. Editing a user message and regenerating an
//! assistant reply both fork; deletion is branch-aware (see
//! [`Conversation::delete_from_index`]).

pub mod tree;
pub mod types;

pub use types::{Attachment, Branch, Conversation, StoredMessage, ToolCallRecord};
