// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Braid workspace.
//!
//! Provides a scripted tool executor, a counting runtime lifecycle, and
//! builders for NDJSON chat-stream bodies served through wiremock.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use braid_core::{BraidError, RuntimeLifecycle, ToolExecutor, ToolOutcome};

/// A tool executor with a fixed set of enabled tools and scripted outcomes.
///
/// Outcomes are consumed in order; when the script runs dry every call
/// succeeds with a canned message. All calls are recorded for assertions.
pub struct MockToolExecutor {
    enabled: HashSet<String>,
    outcomes: Mutex<VecDeque<ToolOutcome>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockToolExecutor {
    pub fn new(enabled: &[&str]) -> Self {
        Self {
            enabled: enabled.iter().map(|s| s.to_string()).collect(),
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// No tools enabled at all.
    pub fn disabled() -> Self {
        Self::new(&[])
    }

    pub fn with_outcomes(self, outcomes: Vec<ToolOutcome>) -> Self {
        *self.outcomes.lock().unwrap() = outcomes.into();
        self
    }

    /// The (tool id, arguments) pairs executed so far.
    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    fn is_enabled(&self, tool_id: &str) -> bool {
        self.enabled.contains(tool_id)
    }

    async fn execute(
        &self,
        tool_id: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolOutcome, BraidError> {
        self.calls
            .lock()
            .unwrap()
            .push((tool_id.to_string(), arguments.clone()));
        let scripted = self.outcomes.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| ToolOutcome::ok("mock tool result")))
    }
}

/// A runtime lifecycle that counts `ensure_server_ready` calls.
#[derive(Default)]
pub struct MockLifecycle {
    calls: AtomicUsize,
    fail: bool,
}

impl MockLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A lifecycle whose readiness check always fails.
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuntimeLifecycle for MockLifecycle {
    async fn ensure_server_ready(&self) -> Result<(), BraidError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(BraidError::provider("runtime refused to come back"))
        } else {
            Ok(())
        }
    }
}

/// Builders for NDJSON chat-stream bodies.
pub mod ndjson {
    /// One chunk carrying answer content.
    pub fn content_line(content: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({"message": {"role": "assistant", "content": content}, "done": false})
        )
    }

    /// One chunk carrying thinking tokens.
    pub fn thinking_line(thinking: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({"message": {"role": "assistant", "thinking": thinking}, "done": false})
        )
    }

    /// The terminal chunk with usage counters.
    pub fn done_line(prompt_eval_count: u32, eval_count: u32) -> String {
        format!(
            "{}\n",
            serde_json::json!({
                "done": true,
                "prompt_eval_count": prompt_eval_count,
                "eval_count": eval_count
            })
        )
    }

    /// A complete single-answer stream body.
    pub fn simple_body(content: &str) -> String {
        format!("{}{}", content_line(content), done_line(1, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_tools_record_calls_and_script_outcomes() {
        let tools = MockToolExecutor::new(&["read_file"])
            .with_outcomes(vec![ToolOutcome::failed("no such file")]);

        assert!(tools.is_enabled("read_file"));
        assert!(!tools.is_enabled("web_search"));

        let outcome = tools
            .execute("read_file", &serde_json::json!({"path": "x"}))
            .await
            .unwrap();
        assert!(!outcome.success);

        // Script exhausted -- defaults to success.
        let outcome = tools
            .execute("read_file", &serde_json::json!({}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(tools.call_count(), 2);
    }

    #[tokio::test]
    async fn mock_lifecycle_counts_calls() {
        let lifecycle = MockLifecycle::new();
        lifecycle.ensure_server_ready().await.unwrap();
        lifecycle.ensure_server_ready().await.unwrap();
        assert_eq!(lifecycle.call_count(), 2);

        let failing = MockLifecycle::failing();
        assert!(failing.ensure_server_ready().await.is_err());
    }

    #[test]
    fn ndjson_lines_are_parseable_json() {
        let line = ndjson::content_line("Hi");
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["message"]["content"], "Hi");

        let done = ndjson::done_line(3, 7);
        let value: serde_json::Value = serde_json::from_str(done.trim()).unwrap();
        assert_eq!(value["done"], true);
        assert_eq!(value["eval_count"], 7);
    }
}
