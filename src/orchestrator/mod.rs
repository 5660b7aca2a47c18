//! Orchestration layer adapter.
//!
//! # Data Flow
//! ```text
//! controller / readiness poller / startup reconcile
//!     → client.rs (ReplicaClient trait: get status, set desired replicas)
//!     → kubernetes.rs (StatefulSet GET / strategic merge PATCH)
//!         ↳ kubeconfig.rs (API server + token when running out of cluster)
//!     → types.rs (ReplicaStatus snapshot or OrchestratorError)
//! ```
//!
//! # Design Decisions
//! - The scaler only ever sees the trait, so tests script it in memory
//! - Errors are passed through, never retried here
//! - Status snapshots are plain values with no identity

pub mod client;
pub mod kubeconfig;
pub mod kubernetes;
pub mod types;

pub use client::ReplicaClient;
pub use kubeconfig::BearerToken;
pub use kubernetes::KubernetesClient;
pub use types::{OrchestratorError, OrchestratorResult, ReplicaStatus};
