//! Seam between the lifecycle stages and real console sessions.
use async_trait::async_trait;
use ibn_core::{IbnError, Result};
use tracing::{debug, info};

use crate::session::{ConsoleOptions, ConsoleSession};
use crate::target::ConsoleTarget;

/// Runs one batch of commands against one device console.
#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    /// One output per command, in command order. Any failure fails the whole batch.
    async fn run_batch(&self, target: &ConsoleTarget, commands: &[String]) -> Result<Vec<String>>;
}

/// Opens a fresh TCP session per batch.
#[derive(Debug, Clone, Default)]
pub struct TcpConsoleConnector {
    options: ConsoleOptions,
}

impl TcpConsoleConnector {
    pub fn new(options: ConsoleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConsoleOptions {
        &self.options
    }
}

#[async_trait]
impl ConsoleConnector for TcpConsoleConnector {
    async fn run_batch(&self, target: &ConsoleTarget, commands: &[String]) -> Result<Vec<String>> {
        info!(%target, commands = commands.len(), "opening console session");
        let mut session = ConsoleSession::connect(&target.host, target.port, self.options)
            .await
            .map_err(|e| IbnError::device(&target.device, e))?;

        let result = session.run_commands(commands).await;
        // The socket is released on drop even if shutdown fails.
        if let Err(e) = session.close().await {
            debug!(%target, error = %e, "console shutdown failed");
        }

        result.map_err(|e| IbnError::device(&target.device, e))
    }
}
