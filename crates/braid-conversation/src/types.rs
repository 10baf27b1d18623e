// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation, branch, and message types.
//!
//! Branches are independent message arrays; messages are value-identified
//! records. A message id is assigned once at creation and copied verbatim
//! when a fork duplicates the message into a new branch -- that shared id is
//! what lets multiple branches be recognized as variants of the same turn.

use braid_core::ChatRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A conversation: one or more branches plus the id of the active one.
///
/// Invariants: `branches` is never empty, and `active_branch_id` always
/// resolves to a member (accessors fall back to the first branch when the
/// id is stale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub branches: Vec<Branch>,
    pub active_branch_id: String,
    /// The ephemeral scratch conversation: never persisted, never feeds
    /// the memory editor.
    #[serde(default)]
    pub is_temporary: bool,
}

/// One variant of a conversation after a fork point.
///
/// Branches are appended in creation order; that vector order doubles as
/// the creation-time ordering used by variant navigation and deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Index in the parent branch's message list at which this branch
    /// diverged; `None` for the original branch.
    pub forked_from_user_message_index: Option<usize>,
    pub messages: Vec<StoredMessage>,
}

impl Branch {
    pub(crate) fn new(forked_from_user_message_index: Option<usize>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            forked_from_user_message_index,
            messages: Vec::new(),
        }
    }

    /// Whether this branch contains a user message with the given id.
    pub fn contains_user_message(&self, message_id: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == ChatRole::User && m.id == message_id)
    }
}

/// A single stored message within a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    /// Reasoning tokens captured separately from the answer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_trace: Vec<ToolCallRecord>,
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            thinking: None,
            attachments: Vec::new(),
            tool_trace: Vec::new(),
            is_done: true,
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Opaque context carried alongside a user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub text: String,
}

/// One executed tool round-trip recorded on an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: serde_json::Value,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_message_gets_a_fresh_id() {
        let a = StoredMessage::user("hi");
        let b = StoredMessage::user("hi");
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn contains_user_message_checks_role() {
        let mut branch = Branch::new(None);
        let mut msg = StoredMessage::assistant("answer");
        msg.id = "m1".to_string();
        branch.messages.push(msg);

        // Same id, but role is assistant -- not a user-message match.
        assert!(!branch.contains_user_message("m1"));

        let mut msg = StoredMessage::user("question");
        msg.id = "m2".to_string();
        branch.messages.push(msg);
        assert!(branch.contains_user_message("m2"));
    }

    #[test]
    fn serde_round_trip_preserves_ids() {
        let mut conv = Conversation::new("test");
        conv.append_message(StoredMessage::user("hello"));
        let id = conv.messages()[0].id.clone();

        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages()[0].id, id);
        assert!(!back.is_temporary);
    }
}
