// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory store contract and its SQLite implementation.
//!
//! Embeddings are stored as little-endian f32 BLOBs; timestamps as RFC 3339
//! text (millisecond precision, Z suffix) so lexicographic comparison in SQL
//! matches chronological order.

use async_trait::async_trait;
use braid_core::BraidError;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::Connection;

use crate::types::{blob_to_vec, vec_to_blob, Memory};

/// CRUD contract over memory records, keyed by opaque id.
///
/// Only the memory editor agent (and direct user edits, outside this
/// engine) mutate the store; retrieval only reads it.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn save(&self, memory: &Memory) -> Result<(), BraidError>;
    async fn update_text(
        &self,
        id: &str,
        text: &str,
        embedding: &[f32],
        at: DateTime<Utc>,
    ) -> Result<(), BraidError>;
    async fn delete(&self, id: &str) -> Result<(), BraidError>;
    async fn get(&self, id: &str) -> Result<Option<Memory>, BraidError>;
    async fn list(&self) -> Result<Vec<Memory>, BraidError>;
    /// Stamps `last_retrieved_at` on every listed id. Best-effort at the
    /// call sites; this method itself reports failures normally.
    async fn touch_retrieved(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<(), BraidError>;
    /// Deletes memories whose `last_retrieved_at` (or `created_at` when
    /// never retrieved) is older than `cutoff`. Returns the removed count.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, BraidError>;
}

/// Helper to convert tokio_rusqlite errors into BraidError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> BraidError {
    BraidError::Storage {
        source: Box::new(e),
    }
}

fn ts_to_text(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn text_to_ts(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// SQLite-backed memory store with vector BLOB storage.
pub struct SqliteMemoryStore {
    conn: Connection,
}

impl SqliteMemoryStore {
    /// Opens (or creates) the store at `path` and applies the schema.
    pub async fn open(path: &str) -> Result<Self, BraidError> {
        let conn = Connection::open(path).await.map_err(|e| storage_err(e.into()))?;
        Self::with_connection(conn).await
    }

    /// Opens an in-memory store. Used by tests and the temporary
    /// conversation flow.
    pub async fn open_in_memory() -> Result<Self, BraidError> {
        let conn = Connection::open_in_memory().await.map_err(|e| storage_err(e.into()))?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> Result<Self, BraidError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS memories (
                    id TEXT PRIMARY KEY NOT NULL,
                    text TEXT NOT NULL,
                    embedding BLOB NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT,
                    last_retrieved_at TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_memories_created ON memories(created_at);",
            )?;
            Ok(())
        })
        .await
        .map_err(storage_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn save(&self, memory: &Memory) -> Result<(), BraidError> {
        let id = memory.id.clone();
        let text = memory.text.clone();
        let embedding = vec_to_blob(&memory.embedding);
        let created_at = ts_to_text(memory.created_at);
        let updated_at = memory.updated_at.map(ts_to_text);
        let last_retrieved_at = memory.last_retrieved_at.map(ts_to_text);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO memories (id, text, embedding, created_at, updated_at, last_retrieved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![id, text, embedding, created_at, updated_at, last_retrieved_at],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn update_text(
        &self,
        id: &str,
        text: &str,
        embedding: &[f32],
        at: DateTime<Utc>,
    ) -> Result<(), BraidError> {
        let id = id.to_string();
        let text = text.to_string();
        let blob = vec_to_blob(embedding);
        let updated_at = ts_to_text(at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE memories SET text = ?1, embedding = ?2, updated_at = ?3 WHERE id = ?4",
                    rusqlite::params![text, blob, updated_at, id],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn delete(&self, id: &str) -> Result<(), BraidError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM memories WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get(&self, id: &str) -> Result<Option<Memory>, BraidError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, text, embedding, created_at, updated_at, last_retrieved_at
                     FROM memories WHERE id = ?1",
                )?;
                let result = stmt.query_row(rusqlite::params![id], row_to_memory);
                match result {
                    Ok(memory) => Ok(Some(memory)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(storage_err)
    }

    async fn list(&self) -> Result<Vec<Memory>, BraidError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, text, embedding, created_at, updated_at, last_retrieved_at
                     FROM memories ORDER BY created_at ASC",
                )?;
                let memories = stmt
                    .query_map([], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(memories)
            })
            .await
            .map_err(storage_err)
    }

    async fn touch_retrieved(
        &self,
        ids: &[String],
        at: DateTime<Utc>,
    ) -> Result<(), BraidError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = ids.to_vec();
        let stamp = ts_to_text(at);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for id in &ids {
                    tx.execute(
                        "UPDATE memories SET last_retrieved_at = ?1 WHERE id = ?2",
                        rusqlite::params![stamp, id],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, BraidError> {
        let cutoff = ts_to_text(cutoff);
        self.conn
            .call(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM memories WHERE COALESCE(last_retrieved_at, created_at) < ?1",
                    rusqlite::params![cutoff],
                )?;
                Ok(removed)
            })
            .await
            .map_err(storage_err)
    }
}

/// Convert a rusqlite Row to a Memory struct.
fn row_to_memory(row: &rusqlite::Row) -> Result<Memory, rusqlite::Error> {
    let embedding_blob: Vec<u8> = row.get(2)?;
    let created_at: String = row.get(3)?;
    let updated_at: Option<String> = row.get(4)?;
    let last_retrieved_at: Option<String> = row.get(5)?;

    Ok(Memory {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding: blob_to_vec(&embedding_blob),
        created_at: text_to_ts(&created_at).unwrap_or_default(),
        updated_at: updated_at.as_deref().and_then(text_to_ts),
        last_retrieved_at: last_retrieved_at.as_deref().and_then(text_to_ts),
    })
}
