//! Startup reconciliation.
//!
//! A restarted scaler has no connections, so any replica still running was
//! left behind by a previous process. Reconciliation runs once, before the
//! listener is bound, and scales such a replica back to zero. Nothing here is
//! fatal.

use crate::scaling::ScaleController;

/// What the one-shot startup check found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Ready replicas were found with no connections; scaled to zero.
    ScaledDown,
    /// No ready replicas; nothing to do.
    AlreadyIdle,
    /// Connections are already being counted; left alone.
    InUse,
    /// The workload could not be read (including not found). Assumed idle.
    Unavailable,
    /// A scale-down was attempted and failed.
    Failed,
}

/// Scale a leftover replica to zero if nothing is connected.
pub async fn reconcile(controller: &ScaleController) -> ReconcileOutcome {
    let workload = controller.workload();
    let status = match controller
        .client()
        .get_status(&workload.namespace, &workload.name)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(
                namespace = %workload.namespace,
                workload = %workload.name,
                error = %e,
                "Could not get initial workload status. Assuming 0 replicas"
            );
            return ReconcileOutcome::Unavailable;
        }
    };

    if status.ready == 0 {
        tracing::info!(%status, "Initial state: no ready replicas");
        return ReconcileOutcome::AlreadyIdle;
    }

    let active = controller.connections().active();
    if active > 0 {
        tracing::info!(%status, active_connections = active, "Initial state: connections already active");
        return ReconcileOutcome::InUse;
    }

    tracing::info!(
        namespace = %workload.namespace,
        workload = %workload.name,
        ready = status.ready,
        "Initial state: ready replicas found with 0 active connections. Initiating scale down to 0"
    );
    match controller.scale_down().await {
        Ok(_) => ReconcileOutcome::ScaledDown,
        Err(_) => ReconcileOutcome::Failed,
    }
}
