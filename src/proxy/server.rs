//! Accept loop.
//!
//! # Responsibilities
//! - Accept client connections until shutdown is signalled
//! - Hand each connection to the scale controller on its own task
//! - Drain in-flight sessions for a bounded time after shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::lifecycle::shutdown::{drain, DrainOutcome};
use crate::net::Listener;
use crate::scaling::ScaleController;

/// Delay before retrying after a failed accept.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// TCP front end for the scaled workload.
#[derive(Debug)]
pub struct ProxyServer {
    controller: Arc<ScaleController>,
    shutdown_timeout: Duration,
}

impl ProxyServer {
    pub fn new(controller: Arc<ScaleController>, shutdown_timeout: Duration) -> Self {
        Self {
            controller,
            shutdown_timeout,
        }
    }

    pub fn controller(&self) -> &Arc<ScaleController> {
        &self.controller
    }

    /// Serve until `shutdown` fires, then wait for open sessions.
    ///
    /// The listener is closed before draining, so no new connection is
    /// accepted once shutdown has begun.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) -> DrainOutcome {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(address = %addr, target = %self.controller.backend_target(), "Proxy server listening"),
            Err(e) => tracing::warn!(error = %e, "Proxy server listening on unknown address"),
        }

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::info!("Shutting down proxy listener");
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr, permit)) => {
                        let controller = Arc::clone(&self.controller);
                        tokio::spawn(async move {
                            let _permit = permit;
                            // Errors are logged by the controller.
                            let _ = controller.handle_connection(stream, peer_addr).await;
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        drain(self.controller.connections(), self.shutdown_timeout).await
    }
}
