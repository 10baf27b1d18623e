// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heartbeat-based implementation of the runtime lifecycle contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use braid_core::{BraidError, RuntimeLifecycle};
use tracing::debug;

use crate::client::OllamaClient;

/// Waits for the runtime to answer its heartbeat endpoint.
///
/// Process supervision of the runtime itself (install, spawn, upgrade) is
/// someone else's job; this implementation only polls until the server is
/// answering again, which is all the session controller's transient-fault
/// recovery needs.
pub struct HeartbeatLifecycle {
    client: Arc<OllamaClient>,
    attempts: u32,
    delay: Duration,
}

impl HeartbeatLifecycle {
    pub fn new(client: Arc<OllamaClient>, attempts: u32, delay: Duration) -> Self {
        Self {
            client,
            attempts,
            delay,
        }
    }
}

#[async_trait]
impl RuntimeLifecycle for HeartbeatLifecycle {
    async fn ensure_server_ready(&self) -> Result<(), BraidError> {
        let mut last_err = None;
        for attempt in 0..self.attempts {
            match self.client.heartbeat().await {
                Ok(()) => {
                    debug!(attempt, "runtime heartbeat ok");
                    return Ok(());
                }
                Err(e) => {
                    last_err = Some(e);
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            BraidError::provider("runtime never became ready")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn ready_when_heartbeat_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = Arc::new(OllamaClient::new(server.uri(), 5).unwrap());
        let lifecycle = HeartbeatLifecycle::new(client, 3, Duration::from_millis(10));
        assert!(lifecycle.ensure_server_ready().await.is_ok());
    }

    #[tokio::test]
    async fn fails_after_exhausting_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = Arc::new(OllamaClient::new(server.uri(), 5).unwrap());
        let lifecycle = HeartbeatLifecycle::new(client, 2, Duration::from_millis(10));
        assert!(lifecycle.ensure_server_ready().await.is_err());
    }
}
