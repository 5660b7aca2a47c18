//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (active count, first/last transitions)
//!     → dial.rs (backend target for ordinal 0, connect with timeout)
//!     → Hand off to the proxy relay
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection counted for scale decisions and graceful shutdown
//! - Dialing sits behind a trait so the target can be observed in tests

pub mod connection;
pub mod dial;
pub mod listener;

pub use connection::{ConnectionId, ConnectionRegister};
pub use dial::{BackendTarget, Connector, TcpConnector};
pub use listener::{ConnectionPermit, Listener, ListenerError};
