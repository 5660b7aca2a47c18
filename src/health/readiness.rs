//! Readiness polling.
//!
//! # Responsibilities
//! - Poll the orchestration layer until the workload has stabilised
//! - Bound the wait with a deadline
//!
//! # Design Decisions
//! - Polling mechanics (`poll_until`) are separate from the stabilisation
//!   predicate (`is_stable`) so each is testable alone
//! - First probe runs immediately, then on a fixed interval
//! - Lookup failures, not-found included, count as "not ready yet"

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::orchestrator::{ReplicaClient, ReplicaStatus};

/// Returned by [`poll_until`] when the deadline passes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

/// Errors from waiting on readiness.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("timed out after {waited:?} waiting for {expected} ready replica(s) (last status: {})", describe(.last))]
    Timeout {
        expected: u32,
        waited: Duration,
        last: Option<ReplicaStatus>,
    },
}

fn describe(last: &Option<ReplicaStatus>) -> String {
    match last {
        Some(status) => status.to_string(),
        None => "unavailable".to_string(),
    }
}

/// True once the workload has fully converged on at least `expected` ready
/// replicas: every desired replica exists and is ready.
pub fn is_stable(status: &ReplicaStatus, expected: u32) -> bool {
    status.ready >= expected
        && status.current == status.desired
        && status.ready == status.desired
        && status.desired >= expected
}

/// Run `probe` now and then every `interval` until it yields `Some`, or
/// until `timeout` has passed.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut probe: F,
) -> Result<T, Elapsed>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let polling = async {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(value) = probe().await {
                return value;
            }
        }
    };

    time::timeout(timeout, polling).await.map_err(|_| Elapsed)
}

/// Block until `namespace/name` reports `expected` ready replicas and is
/// stable, or fail after `timeout`.
pub async fn wait_for_ready(
    client: &dyn ReplicaClient,
    namespace: &str,
    name: &str,
    expected: u32,
    timeout: Duration,
    interval: Duration,
) -> Result<ReplicaStatus, ReadinessError> {
    let started = Instant::now();
    let last = Mutex::new(None);

    let outcome = poll_until(interval, timeout, || {
        let last = &last;
        async move {
            match client.get_status(namespace, name).await {
                Ok(status) => {
                    *last.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
                    if is_stable(&status, expected) {
                        return Some(status);
                    }
                    tracing::debug!(
                        namespace = %namespace,
                        workload = %name,
                        desired = status.desired,
                        current = status.current,
                        ready = status.ready,
                        expected,
                        "Workload not yet stable"
                    );
                    None
                }
                // TODO: classify permanent errors (e.g. a misspelled workload)
                // and fail fast instead of waiting out the deadline.
                Err(e) if e.is_not_found() => {
                    tracing::debug!(namespace = %namespace, workload = %name, "Workload not found yet, retrying");
                    None
                }
                Err(e) => {
                    tracing::warn!(namespace = %namespace, workload = %name, error = %e, "Readiness check failed, retrying");
                    None
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(status) => {
            tracing::info!(
                namespace = %namespace,
                workload = %name,
                ready = status.ready,
                waited = ?started.elapsed(),
                "Workload ready"
            );
            Ok(status)
        }
        Err(Elapsed) => Err(ReadinessError::Timeout {
            expected,
            waited: started.elapsed(),
            last: last.into_inner().unwrap_or_else(PoisonError::into_inner),
        }),
    }
}
