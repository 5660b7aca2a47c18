//! Replica status snapshots and orchestration errors.

use std::fmt;

use thiserror::Error;

/// Replica counts for the workload, fresh per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplicaStatus {
    /// Replicas requested in the workload spec.
    pub desired: u32,
    /// Replicas that currently exist.
    pub current: u32,
    /// Replicas reporting ready.
    pub ready: u32,
}

impl ReplicaStatus {
    pub fn new(desired: u32, current: u32, ready: u32) -> Self {
        Self {
            desired,
            current,
            ready,
        }
    }
}

impl fmt::Display for ReplicaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "desired={} current={} ready={}",
            self.desired, self.current, self.ready
        )
    }
}

/// Errors that can occur while talking to the orchestration layer.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The workload does not exist.
    #[error("workload {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The answer could not be understood.
    #[error("could not decode response: {0}")]
    Decode(String),

    /// Credentials or cluster discovery failed.
    #[error("credentials error: {0}")]
    Credentials(String),
}

impl OrchestratorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, OrchestratorError::NotFound { .. })
    }
}

/// Result type for orchestration operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
