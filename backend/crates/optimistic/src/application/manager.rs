//! Optimistic Update Manager
//!
//! Registry of optimistic changes. Subscribers are notified synchronously,
//! after the registry lock is released, with the full list of records.
//! Mutations are serialized through a delivery lock that stays held until
//! every listener has run, so listeners observe snapshots in mutation order
//! even when several threads write at once. The delivery lock is reentrant:
//! a listener may mutate the manager from inside its callback.

use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use chrono::Utc;
use kernel::error::app_error::AppResult;
use kernel::id::UpdateId;
use parking_lot::{Mutex, ReentrantMutex};
use serde::Serialize;
use serde_json::Value;

use crate::domain::record::{NewUpdate, Rollback, UpdateRecord, UpdateSnapshot, UpdateStatus};
use crate::error::{OptimisticError, OptimisticResult};

type Listener = Arc<dyn Fn(&[UpdateSnapshot]) + Send + Sync>;

#[derive(Default)]
struct Registry {
    records: Vec<UpdateRecord>,
    listeners: Vec<(u64, Listener)>,
    next_listener: u64,
}

impl Registry {
    fn find_mut(&mut self, id: UpdateId) -> OptimisticResult<&mut UpdateRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(OptimisticError::NotFound(id))
    }

    fn snapshot(&self) -> (Vec<UpdateSnapshot>, Vec<Listener>) {
        let records = self.records.iter().map(UpdateRecord::snapshot).collect();
        let listeners = self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
        (records, listeners)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct UpdateStats {
    pub total: usize,
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Clone, Default)]
pub struct OptimisticUpdateManager {
    registry: Arc<Mutex<Registry>>,
    // Taken before `registry`, released after notification
    delivery: Arc<ReentrantMutex<()>>,
}

impl OptimisticUpdateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending change; subscribers see it before this returns
    pub fn add_update(&self, update: NewUpdate) -> UpdateId {
        let record = UpdateRecord::from_new(update, Utc::now());
        let id = record.id;
        tracing::debug!(
            update_id = %id,
            entity_type = %record.entity_type,
            kind = ?record.kind,
            "Optimistic update applied"
        );

        let _delivery = self.delivery.lock();
        let notification = {
            let mut registry = self.registry.lock();
            registry.records.push(record);
            registry.snapshot()
        };
        notify(notification);
        id
    }

    /// Confirm a change; the optimistic payload is replaced by server data
    pub fn mark_success(&self, id: UpdateId, server_data: Value) -> OptimisticResult<()> {
        let _delivery = self.delivery.lock();
        let notification = {
            let mut registry = self.registry.lock();
            let record = registry.find_mut(id).inspect_err(OptimisticError::log)?;
            ensure_pending(record)?;

            record.status = UpdateStatus::Success;
            record.data = server_data;
            record.settled_at = Some(Utc::now());
            record.rollback = None;
            registry.snapshot()
        };

        tracing::debug!(update_id = %id, "Optimistic update confirmed");
        notify(notification);
        Ok(())
    }

    /// Reject a change and roll it back
    ///
    /// The rollback runs outside the registry lock. Its errors and panics are
    /// logged and never surface to the caller.
    pub fn mark_failed(&self, id: UpdateId, error: impl fmt::Display) -> OptimisticResult<()> {
        let error = error.to_string();
        let _delivery = self.delivery.lock();
        let (rollback, notification) = {
            let mut registry = self.registry.lock();
            let record = registry.find_mut(id).inspect_err(OptimisticError::log)?;
            ensure_pending(record)?;

            record.status = UpdateStatus::Failed;
            record.error = Some(error.clone());
            record.settled_at = Some(Utc::now());
            let rollback = record.rollback.take();
            (rollback, registry.snapshot())
        };

        tracing::info!(update_id = %id, error = %error, "Optimistic update rejected, rolling back");
        if let Some(rollback) = rollback {
            run_rollback(id, rollback);
        }
        notify(notification);
        Ok(())
    }

    /// Drop a pending change without rolling it back
    pub fn cancel_update(&self, id: UpdateId) -> OptimisticResult<UpdateSnapshot> {
        let _delivery = self.delivery.lock();
        let (cancelled, notification) = {
            let mut registry = self.registry.lock();
            let position = registry
                .records
                .iter()
                .position(|r| r.id == id)
                .ok_or(OptimisticError::NotFound(id))?;
            ensure_pending(&registry.records[position])?;

            let record = registry.records.remove(position);
            (record.snapshot(), registry.snapshot())
        };

        tracing::debug!(update_id = %id, "Optimistic update cancelled");
        notify(notification);
        Ok(cancelled)
    }

    /// Register a listener; it stays registered while the handle is alive
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[UpdateSnapshot]) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_listener += 1;
        let key = registry.next_listener;
        registry.listeners.push((key, Arc::new(listener)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            key,
        }
    }

    pub fn stats(&self) -> UpdateStats {
        let registry = self.registry.lock();
        registry
            .records
            .iter()
            .fold(UpdateStats::default(), |mut stats, record| {
                stats.total += 1;
                match record.status {
                    UpdateStatus::Pending => stats.pending += 1,
                    UpdateStatus::Success => stats.success += 1,
                    UpdateStatus::Failed => stats.failed += 1,
                }
                stats
            })
    }

    pub fn get(&self, id: UpdateId) -> Option<UpdateSnapshot> {
        self.registry
            .lock()
            .records
            .iter()
            .find(|r| r.id == id)
            .map(UpdateRecord::snapshot)
    }

    pub fn records(&self) -> Vec<UpdateSnapshot> {
        self.registry
            .lock()
            .records
            .iter()
            .map(UpdateRecord::snapshot)
            .collect()
    }

    /// Pending changes for an entity type, optionally narrowed to one entity
    pub fn pending_for(&self, entity_type: &str, entity_id: Option<&str>) -> Vec<UpdateSnapshot> {
        self.registry
            .lock()
            .records
            .iter()
            .filter(|r| r.status.is_pending())
            .map(UpdateRecord::snapshot)
            .filter(|s| s.concerns(entity_type, entity_id))
            .collect()
    }

    /// Remove every settled record; returns how many were removed
    pub fn purge_settled(&self) -> usize {
        let _delivery = self.delivery.lock();
        let (removed, notification) = {
            let mut registry = self.registry.lock();
            let before = registry.records.len();
            registry.records.retain(|r| r.status.is_pending());
            let removed = before - registry.records.len();
            (removed, registry.snapshot())
        };

        if removed > 0 {
            tracing::debug!(removed, "Purged settled optimistic updates");
            notify(notification);
        }
        removed
    }

    /// Apply `update`, await the server call, then settle the record
    pub async fn run<F>(&self, update: NewUpdate, request: F) -> AppResult<Value>
    where
        F: Future<Output = AppResult<Value>>,
    {
        let id = self.add_update(update);
        match request.await {
            Ok(data) => {
                if let Err(e) = self.mark_success(id, data.clone()) {
                    // Cancelled while the call was in flight
                    e.log();
                }
                Ok(data)
            }
            Err(err) => {
                if let Err(e) = self.mark_failed(id, &err) {
                    e.log();
                }
                Err(err)
            }
        }
    }
}

/// RAII listener registration
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    key: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().listeners.retain(|(key, _)| *key != self.key);
        }
    }
}

fn ensure_pending(record: &UpdateRecord) -> OptimisticResult<()> {
    if record.status.is_terminal() {
        let err = OptimisticError::AlreadySettled {
            id: record.id,
            status: record.status,
        };
        err.log();
        return Err(err);
    }
    Ok(())
}

fn run_rollback(id: UpdateId, rollback: Rollback) {
    match catch_unwind(AssertUnwindSafe(rollback)) {
        Ok(Ok(())) => tracing::debug!(update_id = %id, "Rollback applied"),
        Ok(Err(e)) => tracing::error!(update_id = %id, error = %e, "Rollback failed"),
        Err(_) => tracing::error!(update_id = %id, "Rollback panicked"),
    }
}

fn notify((records, listeners): (Vec<UpdateSnapshot>, Vec<Listener>)) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(&records))).is_err() {
            tracing::warn!("Optimistic update listener panicked");
        }
    }
}
