//! Failed Attempt Entity
//!
//! Audit entry for one rejected login.

use chrono::{DateTime, Utc};
use kernel::id::AttemptId;
use serde::{Deserialize, Serialize};

use crate::domain::value_object::principal::Principal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAttempt {
    pub id: AttemptId,
    pub principal: Principal,
    pub at: DateTime<Utc>,
    /// Failure count after this attempt was recorded
    pub attempts: u32,
    /// Whether this attempt caused the account lockout
    pub locked: bool,
}

impl FailedAttempt {
    pub fn new(principal: Principal, at: DateTime<Utc>, attempts: u32, locked: bool) -> Self {
        Self {
            id: AttemptId::new(),
            principal,
            at,
            attempts,
            locked,
        }
    }
}
