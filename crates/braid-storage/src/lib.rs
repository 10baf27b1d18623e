// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation persistence for the Braid engine.
//!
//! The engine only needs key-value style records: conversations by id with
//! get-all, put, delete, and a soft-delete tombstone for trash/restore.
//! [`ConversationStore`] is that contract; [`SqliteConversationStore`] is
//! the bundled implementation.

pub mod sqlite;

use async_trait::async_trait;
use braid_conversation::Conversation;
use braid_core::BraidError;

pub use sqlite::SqliteConversationStore;

/// Key-value style persistence contract for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Inserts or replaces the conversation document.
    async fn put(&self, conversation: &Conversation) -> Result<(), BraidError>;

    /// Loads one conversation by id, trashed or not.
    async fn get(&self, id: &str) -> Result<Option<Conversation>, BraidError>;

    /// All live (non-trashed) conversations, newest first.
    async fn get_all(&self) -> Result<Vec<Conversation>, BraidError>;

    /// All trashed conversations.
    async fn get_trashed(&self) -> Result<Vec<Conversation>, BraidError>;

    /// Stamps the tombstone; the conversation moves to trash.
    async fn soft_delete(&self, id: &str) -> Result<(), BraidError>;

    /// Clears the tombstone; the conversation returns from trash.
    async fn restore(&self, id: &str) -> Result<(), BraidError>;

    /// Permanent removal.
    async fn hard_delete(&self, id: &str) -> Result<(), BraidError>;
}
