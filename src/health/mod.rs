//! Workload readiness subsystem.
//!
//! # Data Flow
//! ```text
//! First connection scales the workload up
//!     → readiness.rs polls ReplicaStatus (immediately, then every interval)
//!     → is_stable(): ready ≥ expected, current == desired == ready
//!     → Ok(status) or ReadinessError::Timeout
//! ```
//!
//! # Design Decisions
//! - A ready-replica count is the only health signal; no probing of the backend itself
//! - Waiting is bounded; the caller abandons the connection on timeout

pub mod readiness;

pub use readiness::{is_stable, poll_until, wait_for_ready, Elapsed, ReadinessError};
