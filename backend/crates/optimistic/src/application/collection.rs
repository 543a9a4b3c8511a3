//! Optimistic List
//!
//! Locally mirrored collection whose add/update/remove operations show up
//! immediately and are undone if the server call fails. Every change goes
//! through the shared [`OptimisticUpdateManager`].

use std::future::Future;
use std::sync::Arc;

use kernel::error::app_error::{AppError, AppResult};
use parking_lot::Mutex;
use serde::Serialize;

use crate::application::manager::OptimisticUpdateManager;
use crate::domain::record::NewUpdate;
use crate::error::OptimisticError;

/// Item stored in an [`OptimisticList`]
pub trait Keyed {
    fn key(&self) -> String;
}

pub struct OptimisticList<T> {
    entity_type: String,
    items: Arc<Mutex<Vec<T>>>,
    manager: OptimisticUpdateManager,
}

impl<T> Clone for OptimisticList<T> {
    fn clone(&self) -> Self {
        Self {
            entity_type: self.entity_type.clone(),
            items: Arc::clone(&self.items),
            manager: self.manager.clone(),
        }
    }
}

impl<T> OptimisticList<T>
where
    T: Keyed + Clone + Serialize + Send + 'static,
{
    pub fn new(
        entity_type: impl Into<String>,
        manager: OptimisticUpdateManager,
        initial: Vec<T>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            items: Arc::new(Mutex::new(initial)),
            manager,
        }
    }

    pub fn items(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Append `item` now; replace it with the server's version on success,
    /// remove it on failure
    pub async fn add<F>(&self, item: T, request: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let local_key = item.key();
        let update = NewUpdate::create(&self.entity_type, serde_json::to_value(&item)?)
            .entity_id(&local_key)
            .on_rollback({
                let items = Arc::clone(&self.items);
                let key = local_key.clone();
                move || {
                    items.lock().retain(|i| i.key() != key);
                    Ok(())
                }
            });

        self.items.lock().push(item);
        let id = self.manager.add_update(update);

        match request.await {
            Ok(saved) => {
                {
                    let mut items = self.items.lock();
                    if let Some(slot) = items.iter_mut().find(|i| i.key() == local_key) {
                        *slot = saved.clone();
                    }
                }
                self.settle_success(id, &saved);
                Ok(saved)
            }
            Err(err) => {
                self.settle_failure(id, &err);
                Err(err)
            }
        }
    }

    /// Replace the item with the same key now; restore the old value on failure
    pub async fn update<F>(&self, item: T, request: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let key = item.key();
        let previous = {
            let mut items = self.items.lock();
            let slot = items
                .iter_mut()
                .find(|i| i.key() == key)
                .ok_or_else(|| not_found(&self.entity_type, &key))?;
            std::mem::replace(slot, item.clone())
        };

        let update = NewUpdate::update(
            &self.entity_type,
            &key,
            serde_json::to_value(&item)?,
            serde_json::to_value(&previous)?,
        )
        .on_rollback({
            let items = Arc::clone(&self.items);
            let key = key.clone();
            move || {
                let mut items = items.lock();
                if let Some(slot) = items.iter_mut().find(|i| i.key() == key) {
                    *slot = previous;
                }
                Ok(())
            }
        });
        let id = self.manager.add_update(update);

        match request.await {
            Ok(saved) => {
                {
                    let mut items = self.items.lock();
                    if let Some(slot) = items.iter_mut().find(|i| i.key() == key) {
                        *slot = saved.clone();
                    }
                }
                self.settle_success(id, &saved);
                Ok(saved)
            }
            Err(err) => {
                self.settle_failure(id, &err);
                Err(err)
            }
        }
    }

    /// Remove the item now; reinsert it at its old position on failure
    pub async fn remove<F>(&self, key: &str, request: F) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let (index, removed) = {
            let mut items = self.items.lock();
            let index = items
                .iter()
                .position(|i| i.key() == key)
                .ok_or_else(|| not_found(&self.entity_type, key))?;
            (index, items.remove(index))
        };

        let update = NewUpdate::delete(&self.entity_type, key, serde_json::to_value(&removed)?)
            .on_rollback({
                let items = Arc::clone(&self.items);
                move || {
                    let mut items = items.lock();
                    let index = index.min(items.len());
                    items.insert(index, removed);
                    Ok(())
                }
            });
        let id = self.manager.add_update(update);

        match request.await {
            Ok(()) => {
                if let Err(e) = self.manager.mark_success(id, serde_json::Value::Null) {
                    e.log();
                }
                Ok(())
            }
            Err(err) => {
                self.settle_failure(id, &err);
                Err(err)
            }
        }
    }

    fn settle_success(&self, id: kernel::id::UpdateId, saved: &T) {
        let data = match serde_json::to_value(saved) {
            Ok(data) => data,
            Err(e) => {
                // Confirm anyway; the record keeps its optimistic payload
                OptimisticError::Serialization(e).log();
                self.manager
                    .get(id)
                    .map(|snapshot| snapshot.data)
                    .unwrap_or_default()
            }
        };
        if let Err(e) = self.manager.mark_success(id, data) {
            e.log();
        }
    }

    fn settle_failure(&self, id: kernel::id::UpdateId, err: &AppError) {
        if let Err(e) = self.manager.mark_failed(id, err) {
            e.log();
        }
    }
}

fn not_found(entity_type: &str, key: &str) -> AppError {
    AppError::validation(format!("{} '{}' is not in the list", entity_type, key))
}
