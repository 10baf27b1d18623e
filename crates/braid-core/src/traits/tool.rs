// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool executor contract.

use async_trait::async_trait;

use crate::error::BraidError;
use crate::types::ToolOutcome;

/// Dispatches tool calls requested by the model mid-stream.
///
/// The engine only needs to know whether a tool id is currently enabled
/// and how to execute it; concrete tool implementations (file I/O, web
/// search, ...) are out of scope.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Whether `tool_id` names a registered, currently-enabled tool.
    fn is_enabled(&self, tool_id: &str) -> bool;

    /// Executes the tool with the model-supplied arguments object.
    async fn execute(
        &self,
        tool_id: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolOutcome, BraidError>;
}
