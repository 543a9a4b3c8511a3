//! In-Memory Security Store

use std::collections::{HashMap, VecDeque};

use parking_lot::{Mutex, RwLock};

use crate::domain::entity::{failed_attempt::FailedAttempt, login_security::LoginSecurityRecord};
use crate::domain::repository::SecurityStore;
use crate::domain::value_object::principal::Principal;
use crate::error::AuthResult;

#[derive(Default)]
pub struct MemorySecurityStore {
    records: RwLock<HashMap<Principal, LoginSecurityRecord>>,
    attempts: Mutex<VecDeque<FailedAttempt>>,
}

impl MemorySecurityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecurityStore for MemorySecurityStore {
    async fn load(&self, principal: &Principal) -> AuthResult<Option<LoginSecurityRecord>> {
        Ok(self.records.read().get(principal).cloned())
    }

    async fn save(&self, principal: &Principal, record: &LoginSecurityRecord) -> AuthResult<()> {
        self.records
            .write()
            .insert(principal.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, principal: &Principal) -> AuthResult<()> {
        self.records.write().remove(principal);
        Ok(())
    }

    async fn append_attempt(&self, attempt: &FailedAttempt, limit: usize) -> AuthResult<()> {
        let mut attempts = self.attempts.lock();
        attempts.push_back(attempt.clone());
        while attempts.len() > limit {
            attempts.pop_front();
        }
        Ok(())
    }

    async fn attempts(&self, principal: Option<&Principal>) -> AuthResult<Vec<FailedAttempt>> {
        Ok(self
            .attempts
            .lock()
            .iter()
            .filter(|a| principal.is_none_or(|p| &a.principal == p))
            .cloned()
            .collect())
    }

    async fn clear(&self) -> AuthResult<()> {
        self.records.write().clear();
        self.attempts.lock().clear();
        Ok(())
    }
}
