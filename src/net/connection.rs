//! Active connection accounting.
//!
//! # Responsibilities
//! - Count proxied connections that are open right now
//! - Report the first (0 → 1) and last (1 → 0) transitions
//! - Generate unique connection IDs for tracing
//! - Signal shutdown drain when the count reaches zero

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Process-wide count of active proxied connections.
///
/// Every decision is taken on the value returned by the atomic
/// read-modify-write itself, never on a separate load.
#[derive(Debug, Default)]
pub struct ConnectionRegister {
    active: AtomicU64,
    idle: Notify,
}

impl ConnectionRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted connection. Returns true if it is the only one.
    pub fn open(&self) -> bool {
        self.active.fetch_add(1, Ordering::SeqCst) + 1 == 1
    }

    /// Record a finished connection. Returns true if none remain.
    ///
    /// Must be paired with a prior [`open`](Self::open).
    pub fn close(&self) -> bool {
        let previous = self.active.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "close() without matching open()");
        let is_last = previous == 1;
        if is_last {
            self.idle.notify_waiters();
        }
        is_last
    }

    /// Current count of active connections.
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    /// Wait until no connections are active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a close() in between is not missed.
            notified.as_mut().enable();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}
