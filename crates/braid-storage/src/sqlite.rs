// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the conversation store.
//!
//! Each conversation is stored as one JSON document row keyed by id. The
//! engine treats the store as key-value; no relational decomposition of
//! branches or messages is attempted. Trash support is a `deleted_at`
//! tombstone column.

use async_trait::async_trait;
use braid_conversation::Conversation;
use braid_core::BraidError;
use chrono::{SecondsFormat, Utc};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::ConversationStore;

/// Helper to convert tokio_rusqlite errors into BraidError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> BraidError {
    BraidError::Storage {
        source: Box::new(e),
    }
}

fn serde_err(e: serde_json::Error) -> BraidError {
    BraidError::Storage {
        source: Box::new(e),
    }
}

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    conn: Connection,
}

impl SqliteConversationStore {
    /// Opens (or creates) the store at `path` and applies the schema.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, BraidError> {
        let conn = Connection::open(path).await.map_err(|e| storage_err(e.into()))?;
        Self::with_connection(conn, wal_mode).await
    }

    /// Opens an in-memory store for tests and the temporary flow.
    pub async fn open_in_memory() -> Result<Self, BraidError> {
        let conn = Connection::open_in_memory().await.map_err(|e| storage_err(e.into()))?;
        Self::with_connection(conn, false).await
    }

    async fn with_connection(conn: Connection, wal_mode: bool) -> Result<Self, BraidError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS conversations (
                    id TEXT PRIMARY KEY NOT NULL,
                    title TEXT NOT NULL,
                    document TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_conversations_deleted ON conversations(deleted_at);",
            )?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        debug!("conversation store ready");
        Ok(Self { conn })
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn put(&self, conversation: &Conversation) -> Result<(), BraidError> {
        let id = conversation.id.clone();
        let title = conversation.title.clone();
        let document = serde_json::to_string(conversation).map_err(serde_err)?;
        let created_at = conversation
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let updated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (id, title, document, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                         title = excluded.title,
                         document = excluded.document,
                         updated_at = excluded.updated_at",
                    rusqlite::params![id, title, document, created_at, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get(&self, id: &str) -> Result<Option<Conversation>, BraidError> {
        let id = id.to_string();
        let document: Option<String> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT document FROM conversations WHERE id = ?1")?;
                let result = stmt.query_row(rusqlite::params![id], |row| row.get(0));
                match result {
                    Ok(doc) => Ok(Some(doc)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(storage_err)?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(serde_err))
            .transpose()
    }

    async fn get_all(&self) -> Result<Vec<Conversation>, BraidError> {
        self.load_where("deleted_at IS NULL").await
    }

    async fn get_trashed(&self) -> Result<Vec<Conversation>, BraidError> {
        self.load_where("deleted_at IS NOT NULL").await
    }

    async fn soft_delete(&self, id: &str) -> Result<(), BraidError> {
        let id = id.to_string();
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE conversations SET deleted_at = ?1 WHERE id = ?2",
                    rusqlite::params![stamp, id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn restore(&self, id: &str) -> Result<(), BraidError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE conversations SET deleted_at = NULL WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn hard_delete(&self, id: &str) -> Result<(), BraidError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM conversations WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }
}

impl SqliteConversationStore {
    async fn load_where(&self, predicate: &'static str) -> Result<Vec<Conversation>, BraidError> {
        let documents: Vec<String> = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT document FROM conversations WHERE {predicate} ORDER BY created_at DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let docs = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(docs)
            })
            .await
            .map_err(storage_err)?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(serde_err))
            .collect()
    }
}
