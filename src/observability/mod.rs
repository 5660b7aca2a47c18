//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!
//! Consumers:
//!     → stdout, text or JSON lines
//! ```
//!
//! # Design Decisions
//! - Structured fields, not interpolated strings
//! - Connection ID flows through every per-connection event

pub mod logging;
