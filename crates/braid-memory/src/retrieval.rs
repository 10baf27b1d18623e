// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget-constrained semantic retrieval over the memory store.
//!
//! Scoring is a linear scan with cosine similarity -- the store is small
//! and scanning it keeps retrieval exact. Candidates pass a minimum-score
//! filter, a candidate cap, and a final top-k cap, then render greedily
//! into a fixed-header text block under a character budget.

use std::sync::Arc;

use braid_core::BraidError;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::store::MemoryStore;
use crate::types::{cosine_similarity, Memory, ScoredMemory};

/// Tunables for one retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Scored candidates kept before the final cap.
    pub candidate_k: usize,
    /// Maximum memories rendered into the block.
    pub top_k: usize,
    /// Minimum cosine similarity to consider a memory at all.
    pub min_score: f32,
    /// Character budget for the rendered block.
    pub max_chars: usize,
}

/// The rendered result of one retrieval pass.
#[derive(Debug, Clone)]
pub struct RetrievedMemories {
    /// The renderable block; empty when nothing fit the budget.
    pub text: String,
    pub used_chars: usize,
    pub count: usize,
    /// The memories included in the block, in rank order.
    pub memories: Vec<Memory>,
}

impl RetrievedMemories {
    fn empty() -> Self {
        Self {
            text: String::new(),
            used_chars: 0,
            count: 0,
            memories: Vec::new(),
        }
    }
}

/// Retrieves and renders relevant memories for a query embedding.
pub struct MemoryRetriever {
    store: Arc<dyn MemoryStore>,
    params: RetrievalParams,
    retention: Duration,
    purge_interval: Duration,
    last_purge: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryRetriever {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        params: RetrievalParams,
        retention_days: u32,
        purge_interval_hours: u32,
    ) -> Self {
        Self {
            store,
            params,
            retention: Duration::days(i64::from(retention_days)),
            purge_interval: Duration::hours(i64::from(purge_interval_hours)),
            last_purge: Mutex::new(None),
        }
    }

    /// Scores every stored memory against `query_embedding` and renders the
    /// best ones into a budgeted block.
    pub async fn retrieve(
        &self,
        query_embedding: &[f32],
    ) -> Result<RetrievedMemories, BraidError> {
        if query_embedding.is_empty() {
            return Ok(RetrievedMemories::empty());
        }

        let all = self.store.list().await?;

        let mut scored: Vec<ScoredMemory> = all
            .into_iter()
            .filter(|m| m.embedding.len() == query_embedding.len())
            .map(|m| {
                let score = cosine_similarity(query_embedding, &m.embedding);
                ScoredMemory { memory: m, score }
            })
            .filter(|s| s.score >= self.params.min_score)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.params.candidate_k);
        scored.truncate(self.params.top_k);

        Ok(render_block(&scored, self.params.max_chars, Utc::now()))
    }

    /// Stamps `last_retrieved_at` on the given memories. Best-effort:
    /// failures are logged and swallowed.
    pub async fn touch_retrieved(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.touch_retrieved(ids, Utc::now()).await {
            warn!(error = %e, "failed to stamp retrieved memories");
        }
    }

    /// Prunes memories outside the retention window, at most once per
    /// purge interval. Failures are logged and swallowed.
    pub async fn maybe_purge_stale(&self) {
        let now = Utc::now();
        {
            let mut last = self.last_purge.lock().await;
            if let Some(last_run) = *last {
                if now - last_run < self.purge_interval {
                    return;
                }
            }
            *last = Some(now);
        }

        match self.store.purge_older_than(now - self.retention).await {
            Ok(removed) if removed > 0 => {
                debug!(removed, "pruned stale memories");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "stale-memory pruning failed"),
        }
    }
}

/// Renders ranked memories into the fixed-header block, adding one memory
/// at a time while the running length stays within `max_chars`. Stops at
/// the first memory that would overflow.
fn render_block(
    scored: &[ScoredMemory],
    max_chars: usize,
    now: DateTime<Utc>,
) -> RetrievedMemories {
    const HEADER: &str = "Relevant memories:\n";

    let mut text = String::from(HEADER);
    let mut included = Vec::new();

    for s in scored {
        let line = format!("- [{}] {}\n", format_age(s.memory.created_at, now), s.memory.text);
        if text.len() + line.len() > max_chars {
            break;
        }
        text.push_str(&line);
        included.push(s.memory.clone());
    }

    if included.is_empty() {
        return RetrievedMemories::empty();
    }

    RetrievedMemories {
        used_chars: text.len(),
        count: included.len(),
        memories: included,
        text,
    }
}

/// Humanized age prefix for one rendered memory line.
fn format_age(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - from;
    if elapsed.num_days() >= 1 {
        format!("{}d ago", elapsed.num_days())
    } else if elapsed.num_hours() >= 1 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        "recent".to_string()
    }
}
