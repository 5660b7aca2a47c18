//! The single pending scale-down timer.
//!
//! # States
//! ```text
//! Idle ──arm──▶ Armed ──delay elapses──▶ Firing ──check passes──▶ action runs
//!                 │                         └──check fails──▶ Idle (no action)
//!                 └──cancel / re-arm──▶ Idle (task aborted)
//! ```
//!
//! One lock guards the handle and a generation number. Arming bumps the
//! generation, so a task that woke up just as it was replaced sees a stale
//! generation and does nothing. The liveness check runs while the lock is
//! held, which orders it against any concurrent cancel.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::AbortHandle;

#[derive(Debug, Default)]
struct TimerSlot {
    pending: Option<AbortHandle>,
    generation: u64,
}

/// At most one armed delayed action, process-wide.
#[derive(Debug, Default)]
pub struct IdleTimer {
    slot: Arc<Mutex<TimerSlot>>,
}

fn lock(slot: &Mutex<TimerSlot>) -> MutexGuard<'_, TimerSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

impl IdleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    /// Cancel the pending timer, if any. Returns true if one was cancelled.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Replace any pending timer with one that waits `delay`, then runs
    /// `action` if `still_idle` holds at that moment.
    ///
    /// Must be called from within a tokio runtime; otherwise nothing is armed.
    pub fn arm<C, A, Fut>(&self, delay: Duration, still_idle: C, action: A)
    where
        C: FnOnce() -> bool + Send + 'static,
        A: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available, scale-down timer not armed");
            return;
        };

        let mut slot = lock(&self.slot);
        if let Some(previous) = slot.pending.take() {
            tracing::debug!("Stopping existing scale-down timer before re-arming");
            previous.abort();
        }
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;

        let shared = Arc::clone(&self.slot);
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let proceed = {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                slot.pending = None;
                still_idle()
            };

            if proceed {
                action().await;
            } else {
                tracing::info!("Scale-down timer fired, but active connections exist. Scale down aborted");
            }
        });
        slot.pending = Some(task.abort_handle());
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.slot).pending.take() {
            handle.abort();
        }
    }
}
