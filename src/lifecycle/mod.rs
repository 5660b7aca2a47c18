//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build client → Reconcile leftover replicas → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then orchestration client, then listener
//! - Reconciliation failures are logged, never fatal
//! - Shutdown has timeout: remaining sessions are cut short after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{drain, DrainOutcome, Shutdown};
pub use startup::{reconcile, ReconcileOutcome};
