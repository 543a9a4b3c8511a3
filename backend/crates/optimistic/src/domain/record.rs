//! Optimistic Update Record
//!
//! A local change applied ahead of server confirmation, together with what
//! is needed to undo it.

use std::fmt;

use chrono::{DateTime, Utc};
use kernel::error::app_error::AppResult;
use kernel::id::UpdateId;
use serde::Serialize;
use serde_json::Value;

/// Undo action for a rejected change. Runs at most once.
pub type Rollback = Box<dyn FnOnce() -> AppResult<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    Create,
    Update,
    Delete,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Pending,
    Success,
    Failed,
}

impl UpdateStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, UpdateStatus::Pending)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_pending()
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateStatus::Pending => "pending",
            UpdateStatus::Success => "success",
            UpdateStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// NewUpdate (input)
// ============================================================================

/// Description of a change about to be applied optimistically
pub struct NewUpdate {
    pub(crate) entity_type: String,
    pub(crate) entity_id: Option<String>,
    pub(crate) kind: UpdateKind,
    pub(crate) data: Value,
    pub(crate) previous_data: Option<Value>,
    pub(crate) rollback: Option<Rollback>,
}

impl NewUpdate {
    pub fn new(entity_type: impl Into<String>, kind: UpdateKind, data: Value) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: None,
            kind,
            data,
            previous_data: None,
            rollback: None,
        }
    }

    pub fn create(entity_type: impl Into<String>, data: Value) -> Self {
        Self::new(entity_type, UpdateKind::Create, data)
    }

    pub fn update(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        data: Value,
        previous: Value,
    ) -> Self {
        Self::new(entity_type, UpdateKind::Update, data)
            .entity_id(entity_id)
            .previous(previous)
    }

    pub fn delete(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        previous: Value,
    ) -> Self {
        Self::new(entity_type, UpdateKind::Delete, Value::Null)
            .entity_id(entity_id)
            .previous(previous)
    }

    pub fn entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn previous(mut self, previous: Value) -> Self {
        self.previous_data = Some(previous);
        self
    }

    pub fn on_rollback<F>(mut self, rollback: F) -> Self
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        self.rollback = Some(Box::new(rollback));
        self
    }
}

impl fmt::Debug for NewUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUpdate")
            .field("entity_type", &self.entity_type)
            .field("entity_id", &self.entity_id)
            .field("kind", &self.kind)
            .field("has_rollback", &self.rollback.is_some())
            .finish()
    }
}

// ============================================================================
// UpdateRecord (stored)
// ============================================================================

pub(crate) struct UpdateRecord {
    pub id: UpdateId,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub kind: UpdateKind,
    pub data: Value,
    pub previous_data: Option<Value>,
    pub status: UpdateStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub rollback: Option<Rollback>,
}

impl UpdateRecord {
    pub fn from_new(update: NewUpdate, now: DateTime<Utc>) -> Self {
        Self {
            id: UpdateId::new(),
            entity_type: update.entity_type,
            entity_id: update.entity_id,
            kind: update.kind,
            data: update.data,
            previous_data: update.previous_data,
            status: UpdateStatus::Pending,
            error: None,
            created_at: now,
            settled_at: None,
            rollback: update.rollback,
        }
    }

    pub fn snapshot(&self) -> UpdateSnapshot {
        UpdateSnapshot {
            id: self.id,
            entity_type: self.entity_type.clone(),
            entity_id: self.entity_id.clone(),
            kind: self.kind,
            data: self.data.clone(),
            previous_data: self.previous_data.clone(),
            status: self.status,
            error: self.error.clone(),
            created_at: self.created_at,
            settled_at: self.settled_at,
        }
    }
}

/// Read-only view of a record handed to callers and subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSnapshot {
    pub id: UpdateId,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub kind: UpdateKind,
    pub data: Value,
    pub previous_data: Option<Value>,
    pub status: UpdateStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl UpdateSnapshot {
    pub fn concerns(&self, entity_type: &str, entity_id: Option<&str>) -> bool {
        self.entity_type == entity_type
            && (entity_id.is_none() || self.entity_id.as_deref() == entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_update_builders() {
        let update = NewUpdate::update("todo", "7", json!({ "done": true }), json!({ "done": false }));
        assert_eq!(update.kind, UpdateKind::Update);
        assert_eq!(update.entity_id.as_deref(), Some("7"));
        assert_eq!(update.previous_data, Some(json!({ "done": false })));
        assert!(update.rollback.is_none());

        let delete = NewUpdate::delete("todo", "7", json!({ "id": "7" })).on_rollback(|| Ok(()));
        assert_eq!(delete.kind, UpdateKind::Delete);
        assert!(delete.data.is_null());
        assert!(delete.rollback.is_some());
    }

    #[test]
    fn test_snapshot_serializes_lowercase_status() {
        let record = UpdateRecord::from_new(NewUpdate::create("todo", json!({})), Utc::now());
        let value = serde_json::to_value(record.snapshot()).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["kind"], "create");
        assert_eq!(value["entityType"], "todo");
    }

    #[test]
    fn test_concerns() {
        let record = UpdateRecord::from_new(
            NewUpdate::create("todo", json!({})).entity_id("1"),
            Utc::now(),
        );
        let snapshot = record.snapshot();
        assert!(snapshot.concerns("todo", None));
        assert!(snapshot.concerns("todo", Some("1")));
        assert!(!snapshot.concerns("todo", Some("2")));
        assert!(!snapshot.concerns("note", None));
    }
}
