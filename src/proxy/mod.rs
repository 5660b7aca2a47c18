//! TCP proxying subsystem.
//!
//! # Data Flow
//! ```text
//! Listener (net/listener.rs)
//!     → server.rs: accept, spawn per-connection task
//!     → scaling/controller.rs: ensure backend, dial
//!     → relay.rs: copy bytes both ways, half-close each direction
//! ```
//!
//! # Design Decisions
//! - Byte-level relay only; no protocol is parsed
//! - Each direction finishes independently (half-close)
//! - End-of-stream and already-closed errors are normal endings

pub mod relay;
pub mod server;

pub use relay::{ProxySession, SessionStats};
pub use server::ProxyServer;
