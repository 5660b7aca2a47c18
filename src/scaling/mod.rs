//! Scale-to-zero subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → controller.rs: ConnectionRegister::open() (first? cancel idle timer)
//!     → status query → maybe scale to 1 → wait for readiness
//!     → dial backend → relay
//!     → guard dropped: ConnectionRegister::close() (last? arm idle timer)
//!
//! Idle timer (idle_timer.rs):
//!     delay elapses → lock → still zero connections? → scale to 0
//! ```
//!
//! # Design Decisions
//! - Only the connection that takes the count from 0 to 1 may scale up
//! - Other connections that find no ready replica are rejected, not queued
//! - Scale requests write an absolute target; one controller per workload
//! - A failed scale-up is not compensated or retried

pub mod controller;
pub mod idle_timer;

pub use controller::{ConnectionError, ConnectionGuard, ScaleController};
pub use idle_timer::IdleTimer;
