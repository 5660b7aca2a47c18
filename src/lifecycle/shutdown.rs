//! Shutdown coordination for the scaler.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::net::ConnectionRegister;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the post-shutdown drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every session finished in time.
    Drained,
    /// The deadline passed with sessions still running.
    TimedOut { remaining: u64 },
}

/// Wait for in-flight sessions to finish, for at most `timeout`.
pub async fn drain(connections: &ConnectionRegister, timeout: Duration) -> DrainOutcome {
    tracing::info!(
        count = connections.active(),
        timeout = ?timeout,
        "Waiting for active connections to close"
    );
    match tokio::time::timeout(timeout, connections.wait_idle()).await {
        Ok(()) => {
            tracing::info!("All active connections closed gracefully");
            DrainOutcome::Drained
        }
        Err(_) => {
            let remaining = connections.active();
            tracing::warn!(
                remaining_connections = remaining,
                "Shutdown timeout reached, some connections may have been cut short"
            );
            DrainOutcome::TimedOut { remaining }
        }
    }
}
