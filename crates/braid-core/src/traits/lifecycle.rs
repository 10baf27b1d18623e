// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime lifecycle contract.

use async_trait::async_trait;

use crate::error::BraidError;

/// Manages the local inference runtime's process lifecycle.
///
/// Consulted only during transient-fault recovery: when a stream fails
/// because the runtime was mid-restart, the session controller asks the
/// lifecycle collaborator to bring the server back before retrying.
#[async_trait]
pub trait RuntimeLifecycle: Send + Sync {
    /// Blocks until the inference server is ready to accept requests.
    async fn ensure_server_ready(&self) -> Result<(), BraidError>;
}
