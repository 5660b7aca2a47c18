//! Connection-gated scale controller.
//!
//! # Per-connection state machine
//! ```text
//! ACCEPTED ─(first?)─ cancel idle timer ─▶ QUERY_STATUS
//! QUERY_STATUS ──error──────────────────▶ ABORT
//! QUERY_STATUS ──ready == 0, first──────▶ SCALE_UP(1) ─▶ WAIT_READY ─▶ DIAL
//! QUERY_STATUS ──ready == 0, not first──▶ ABORT
//! QUERY_STATUS ──ready > 0──────────────▶ DIAL
//! DIAL ──error──────────────────────────▶ ABORT
//! DIAL ──ok─────────────────────────────▶ RELAY ─▶ TEARDOWN
//! ```
//!
//! TEARDOWN (and every ABORT) drops the [`ConnectionGuard`]; the last guard
//! to go arms the idle timer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpStream;

use crate::config::{ScalingConfig, WorkloadConfig};
use crate::health::{wait_for_ready, ReadinessError};
use crate::net::{BackendTarget, ConnectionId, ConnectionRegister, Connector};
use crate::orchestrator::{OrchestratorError, OrchestratorResult, ReplicaClient, ReplicaStatus};
use crate::proxy::relay::{ProxySession, SessionStats};
use crate::scaling::idle_timer::IdleTimer;

/// Why a single connection was abandoned. None of these affect other
/// connections or process state.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to get workload status: {0}")]
    Status(#[source] OrchestratorError),

    #[error("failed to scale workload to 1 replica: {0}")]
    ScaleUp(#[source] OrchestratorError),

    #[error("workload has 0 ready replicas and this is not the first connection ({active} active)")]
    NotReady { active: u64 },

    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("failed to connect to backend {target}: {source}")]
    Dial {
        target: String,
        #[source]
        source: io::Error,
    },
}

/// Owns the connection count, the idle timer and the orchestration handle.
///
/// Constructed once at startup and shared by every connection task.
pub struct ScaleController {
    client: Arc<dyn ReplicaClient>,
    connector: Arc<dyn Connector>,
    workload: WorkloadConfig,
    target: BackendTarget,
    scaling: ScalingConfig,
    connections: ConnectionRegister,
    idle_timer: IdleTimer,
}

impl std::fmt::Debug for ScaleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScaleController")
            .field("workload", &self.workload)
            .field("target", &self.target)
            .field("active_connections", &self.connections.active())
            .field("idle_timer_armed", &self.idle_timer.is_armed())
            .finish()
    }
}

impl ScaleController {
    pub fn new(
        client: Arc<dyn ReplicaClient>,
        connector: Arc<dyn Connector>,
        workload: WorkloadConfig,
        scaling: ScalingConfig,
    ) -> Arc<Self> {
        let target = BackendTarget::for_workload(&workload);
        Arc::new(Self {
            client,
            connector,
            workload,
            target,
            scaling,
            connections: ConnectionRegister::new(),
            idle_timer: IdleTimer::new(),
        })
    }

    pub fn connections(&self) -> &ConnectionRegister {
        &self.connections
    }

    pub fn idle_timer(&self) -> &IdleTimer {
        &self.idle_timer
    }

    pub fn backend_target(&self) -> &BackendTarget {
        &self.target
    }

    pub fn workload(&self) -> &WorkloadConfig {
        &self.workload
    }

    pub fn client(&self) -> &dyn ReplicaClient {
        self.client.as_ref()
    }

    /// Count a new connection. A first connection cancels any pending
    /// scale-down.
    pub fn connection_opened(self: &Arc<Self>) -> ConnectionGuard {
        let id = ConnectionId::new();
        let is_first = self.connections.open();
        if is_first && self.idle_timer.cancel() {
            tracing::info!(connection_id = %id, "First active connection. Cancelled scale-down timer");
        }
        ConnectionGuard {
            controller: Arc::clone(self),
            id,
            is_first,
        }
    }

    fn connection_closed(self: &Arc<Self>, id: ConnectionId) {
        let is_last = self.connections.close();
        tracing::debug!(
            connection_id = %id,
            active_connections = self.connections.active(),
            "Closed connection"
        );
        if is_last {
            tracing::info!(
                idle_timeout = ?self.scaling.idle_timeout,
                "Last connection closed. Starting scale-down timer"
            );
            self.arm_idle_timer();
        }
    }

    fn arm_idle_timer(self: &Arc<Self>) {
        let check = Arc::downgrade(self);
        let act = Arc::downgrade(self);
        self.idle_timer.arm(
            self.scaling.idle_timeout,
            move || check.upgrade().is_some_and(|c| c.connections.active() == 0),
            move || async move {
                if let Some(controller) = act.upgrade() {
                    tracing::info!(
                        namespace = %controller.workload.namespace,
                        workload = %controller.workload.name,
                        "Scale-down timer fired. Initiating scale down to 0"
                    );
                    // Failures are logged inside; nothing retries.
                    let _ = controller.scale_down().await;
                }
            },
        );
    }

    /// Set the workload's desired replicas to zero.
    pub async fn scale_down(&self) -> OrchestratorResult<ReplicaStatus> {
        let result = self
            .client
            .set_desired_replicas(&self.workload.namespace, &self.workload.name, 0)
            .await;
        match &result {
            Ok(_) => tracing::info!(
                namespace = %self.workload.namespace,
                workload = %self.workload.name,
                "Successfully scaled down to 0 replicas"
            ),
            Err(e) => tracing::error!(
                namespace = %self.workload.namespace,
                workload = %self.workload.name,
                error = %e,
                "Failed to scale down to 0"
            ),
        }
        result
    }

    /// Make sure a ready replica exists before dialing, scaling up only for
    /// the first connection.
    pub async fn prepare_backend(&self, guard: &ConnectionGuard) -> Result<(), ConnectionError> {
        let ns = &self.workload.namespace;
        let name = &self.workload.name;

        let status = self
            .client
            .get_status(ns, name)
            .await
            .map_err(ConnectionError::Status)?;

        tracing::debug!(
            connection_id = %guard.id,
            namespace = %ns,
            workload = %name,
            desired = status.desired,
            current = status.current,
            ready = status.ready,
            "Workload status"
        );

        if status.ready > 0 {
            return Ok(());
        }
        if !guard.is_first {
            return Err(ConnectionError::NotReady {
                active: self.connections.active(),
            });
        }

        tracing::info!(
            connection_id = %guard.id,
            namespace = %ns,
            workload = %name,
            "First connection and 0 ready replicas. Initiating scale up to 1 replica"
        );
        self.client
            .set_desired_replicas(ns, name, 1)
            .await
            .map_err(ConnectionError::ScaleUp)?;

        wait_for_ready(
            self.client.as_ref(),
            ns,
            name,
            1,
            self.scaling.ready_timeout,
            self.scaling.poll_interval,
        )
        .await?;
        Ok(())
    }

    /// Drive one accepted client connection to completion.
    ///
    /// The connection is counted for its whole lifetime, whichever way it ends.
    pub async fn handle_connection(
        self: &Arc<Self>,
        client: TcpStream,
        peer_addr: SocketAddr,
    ) -> Result<SessionStats, ConnectionError> {
        let guard = self.connection_opened();
        let id = guard.id;
        tracing::debug!(
            connection_id = %id,
            peer_addr = %peer_addr,
            active_connections = self.connections.active(),
            "Accepted connection"
        );

        let result = self.serve(&guard, client).await;
        if let Err(e) = &result {
            tracing::error!(
                connection_id = %id,
                peer_addr = %peer_addr,
                error = %e,
                "Closing connection"
            );
        }
        drop(guard);
        result
    }

    async fn serve(
        &self,
        guard: &ConnectionGuard,
        client: TcpStream,
    ) -> Result<SessionStats, ConnectionError> {
        self.prepare_backend(guard).await?;

        tracing::debug!(connection_id = %guard.id, target = %self.target, "Attempting to proxy connection");
        let backend = self
            .connector
            .connect(&self.target)
            .await
            .map_err(|source| ConnectionError::Dial {
                target: self.target.to_string(),
                source,
            })?;
        tracing::debug!(connection_id = %guard.id, target = %self.target, "Connected to backend");

        Ok(ProxySession::new(guard.id, client, backend).run().await)
    }
}

/// Brackets one connection: opened on creation, closed on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    controller: Arc<ScaleController>,
    id: ConnectionId,
    is_first: bool,
}

impl ConnectionGuard {
    /// Whether this connection took the count from 0 to 1.
    pub fn is_first(&self) -> bool {
        self.is_first
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.controller.connection_closed(self.id);
    }
}
