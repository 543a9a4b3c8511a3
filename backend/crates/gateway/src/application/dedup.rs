//! Request Deduplication
//!
//! Coalesces identical logical requests. While a fingerprint is in flight,
//! every further caller subscribes to the same outcome instead of issuing a
//! second network call. A successful outcome is then served from a short-lived
//! cache; failures are never cached.
//!
//! The executor future runs on its own task, so a caller dropping its handle
//! does not cancel the work other subscribers are waiting on.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use kernel::error::app_error::{AppError, AppResult};
use parking_lot::Mutex;
use platform::fingerprint::RequestFingerprint;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;

// ============================================================================
// State
// ============================================================================

struct InFlight<V> {
    entry_id: u64,
    waiters: Vec<oneshot::Sender<AppResult<V>>>,
    task: Option<AbortHandle>,
}

struct Cached<V> {
    value: V,
    expires_at: Instant,
}

struct DedupState<V> {
    in_flight: HashMap<RequestFingerprint, InFlight<V>>,
    cache: HashMap<RequestFingerprint, Cached<V>>,
    next_entry: u64,
}

impl<V> Default for DedupState<V> {
    fn default() -> Self {
        Self {
            in_flight: HashMap::new(),
            cache: HashMap::new(),
            next_entry: 0,
        }
    }
}

/// Snapshot of deduplicator occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DedupStats {
    pub in_flight: usize,
    pub cached: usize,
}

// ============================================================================
// Deduplicator
// ============================================================================

pub struct RequestDeduplicator<V> {
    state: Arc<Mutex<DedupState<V>>>,
    ttl: Duration,
}

impl<V> Clone for RequestDeduplicator<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            ttl: self.ttl,
        }
    }
}

impl<V> RequestDeduplicator<V>
where
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(DedupState::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run `executor` unless an identical request is already in flight or
    /// a fresh cached result exists.
    ///
    /// `executor` is only invoked for the first caller of a fingerprint and
    /// must only build the future; it is called while the internal lock is
    /// held.
    pub async fn dedupe<F, Fut>(&self, fingerprint: RequestFingerprint, executor: F) -> AppResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<V>> + Send + 'static,
    {
        let receiver = {
            let mut state = self.state.lock();

            if let Some(cached) = state.cache.get(&fingerprint) {
                if cached.expires_at > Instant::now() {
                    tracing::debug!(fingerprint = %fingerprint, "Serving deduplicated result from cache");
                    return Ok(cached.value.clone());
                }
                state.cache.remove(&fingerprint);
            }

            let (tx, rx) = oneshot::channel();

            if let Some(entry) = state.in_flight.get_mut(&fingerprint) {
                entry.waiters.push(tx);
                tracing::debug!(
                    fingerprint = %fingerprint,
                    subscribers = entry.waiters.len(),
                    "Joined in-flight request"
                );
            } else {
                state.next_entry += 1;
                let entry_id = state.next_entry;

                let task = tokio::spawn(settle(
                    Arc::clone(&self.state),
                    fingerprint.clone(),
                    entry_id,
                    self.ttl,
                    executor(),
                ));

                state.in_flight.insert(
                    fingerprint,
                    InFlight {
                        entry_id,
                        waiters: vec![tx],
                        task: Some(task.abort_handle()),
                    },
                );
            }

            rx
        };

        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(AppError::cancelled("Request was cancelled")),
        }
    }

    /// Abort every in-flight request; all subscribers receive `Cancelled`
    ///
    /// Returns the number of subscribers notified.
    pub fn cancel_all(&self) -> usize {
        let entries: Vec<InFlight<V>> = {
            let mut state = self.state.lock();
            state.in_flight.drain().map(|(_, entry)| entry).collect()
        };

        let mut notified = 0;
        for entry in entries {
            if let Some(task) = entry.task {
                task.abort();
            }
            for waiter in entry.waiters {
                if waiter
                    .send(Err(AppError::cancelled("Request was cancelled")))
                    .is_ok()
                {
                    notified += 1;
                }
            }
        }

        if notified > 0 {
            tracing::info!(notified, "Cancelled in-flight requests");
        }
        notified
    }

    /// Drop all cached results; in-flight requests are unaffected
    pub fn clear_cache(&self) {
        self.state.lock().cache.clear();
    }

    /// Drop expired cache entries
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.cache.len();
        state.cache.retain(|_, cached| cached.expires_at > now);
        before - state.cache.len()
    }

    pub fn stats(&self) -> DedupStats {
        let state = self.state.lock();
        DedupStats {
            in_flight: state.in_flight.len(),
            cached: state.cache.len(),
        }
    }
}

/// Drive the executor to completion and fan the outcome out to subscribers
async fn settle<V, Fut>(
    state: Arc<Mutex<DedupState<V>>>,
    fingerprint: RequestFingerprint,
    entry_id: u64,
    ttl: Duration,
    work: Fut,
) where
    V: Clone + Send + 'static,
    Fut: Future<Output = AppResult<V>> + Send + 'static,
{
    let result = match AssertUnwindSafe(work).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(fingerprint = %fingerprint, "Request executor panicked");
            Err(AppError::internal("Request executor panicked"))
        }
    };

    let waiters = {
        let mut state = state.lock();
        let entry = match state.in_flight.remove(&fingerprint) {
            Some(entry) if entry.entry_id == entry_id => entry,
            // Cancelled and replaced by a newer request
            Some(newer) => {
                state.in_flight.insert(fingerprint, newer);
                return;
            }
            None => return,
        };

        if let Ok(value) = &result {
            state.cache.insert(
                fingerprint,
                Cached {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }
        entry.waiters
    };

    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
}
