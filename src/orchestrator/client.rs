//! The two control-plane operations the scaler needs.

use async_trait::async_trait;

use crate::orchestrator::types::{OrchestratorResult, ReplicaStatus};

/// Adapter over the orchestration layer.
///
/// Implementations pass errors through untouched; callers decide what is
/// fatal. Setting the desired count is an absolute write, not a
/// compare-and-swap.
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Read the workload's desired/current/ready counts.
    async fn get_status(&self, namespace: &str, name: &str) -> OrchestratorResult<ReplicaStatus>;

    /// Set the workload's desired replica count and return the resulting status.
    async fn set_desired_replicas(
        &self,
        namespace: &str,
        name: &str,
        count: u32,
    ) -> OrchestratorResult<ReplicaStatus>;
}
