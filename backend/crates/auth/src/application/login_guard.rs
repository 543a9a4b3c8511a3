//! Login Attempt Guard
//!
//! Tracks failed logins per principal: captcha after repeated failures,
//! temporary lockout after more. The guard never fails its caller; when the
//! store is unavailable it degrades to "no prior attempts" and logs a warning.

use std::sync::Arc;

use kernel::clock::{Clock, SystemClock};
use platform::password::{PasswordStrengthReport, validate_password_strength};
use tokio::sync::Mutex;

use crate::application::config::GuardConfig;
use crate::domain::entity::{
    failed_attempt::FailedAttempt,
    login_security::{LockStatus, LoginSecurityRecord},
};
use crate::domain::repository::SecurityStore;
use crate::domain::value_object::principal::Principal;

pub struct LoginAttemptGuard<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: GuardConfig,
    // Serializes read-modify-write cycles against the store
    write: Mutex<()>,
}

impl<S: SecurityStore + Sync> LoginAttemptGuard<S> {
    pub fn new(store: Arc<S>, config: GuardConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: GuardConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config,
            write: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Count a rejected login and return the updated record
    pub async fn record_failed_attempt(&self, principal: &Principal) -> LoginSecurityRecord {
        let _write = self.write.lock().await;
        let now = self.clock.now();
        let mut record = self.load_or_default(principal).await;

        if !record.register_failure(now, &self.config.throttle) {
            tracing::debug!(principal = %principal, "Failure during lockout ignored");
            return record;
        }
        self.persist(principal, &record).await;

        let locked = record.is_locked(now);
        let attempt = FailedAttempt::new(principal.clone(), now, record.attempts, locked);
        if let Err(e) = self
            .store
            .append_attempt(&attempt, self.config.audit_limit)
            .await
        {
            tracing::warn!(error = %e, "Failed to append login audit entry");
        }

        if locked {
            tracing::warn!(
                principal = %principal,
                attempts = record.attempts,
                "Account locked after repeated failures"
            );
        } else {
            tracing::info!(
                principal = %principal,
                attempts = record.attempts,
                requires_captcha = record.requires_captcha,
                "Failed login recorded"
            );
        }
        record
    }

    /// Forget all throttle state for the principal
    pub async fn record_successful_login(&self, principal: &Principal) {
        let _write = self.write.lock().await;
        if let Err(e) = self.store.remove(principal).await {
            tracing::warn!(error = %e, principal = %principal, "Failed to clear security record");
        }
        tracing::debug!(principal = %principal, "Security record cleared after login");
    }

    /// Current lock state; an expired lockout is cleared as a side effect
    pub async fn is_account_locked(&self, principal: &Principal) -> LockStatus {
        let _write = self.write.lock().await;
        let now = self.clock.now();
        let mut record = self.load_or_default(principal).await;

        if record.clear_expired_lock(now) {
            tracing::debug!(principal = %principal, "Lockout expired");
            self.persist(principal, &record).await;
        }
        record.lock_status(now)
    }

    pub async fn requires_captcha(&self, principal: &Principal) -> bool {
        self.load_or_default(principal).await.requires_captcha
    }

    /// Reset attempts, lockout and captcha flag
    pub async fn unlock_account(&self, principal: &Principal) {
        let _write = self.write.lock().await;
        if let Err(e) = self.store.remove(principal).await {
            tracing::warn!(error = %e, principal = %principal, "Failed to unlock account");
            return;
        }
        tracing::info!(principal = %principal, "Account unlocked");
    }

    pub fn validate_password_strength(&self, candidate: &str) -> PasswordStrengthReport {
        validate_password_strength(candidate)
    }

    /// Drop every security record and the audit log
    pub async fn clear_all_security_data(&self) {
        let _write = self.write.lock().await;
        match self.store.clear().await {
            Ok(()) => tracing::info!("All login security data cleared"),
            Err(e) => tracing::warn!(error = %e, "Failed to clear login security data"),
        }
    }

    /// Audit entries for the principal, oldest first
    pub async fn recent_failed_attempts(&self, principal: &Principal) -> Vec<FailedAttempt> {
        self.store
            .attempts(Some(principal))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to read login audit log");
                Vec::new()
            })
    }

    pub async fn security_record(&self, principal: &Principal) -> LoginSecurityRecord {
        self.load_or_default(principal).await
    }

    async fn load_or_default(&self, principal: &Principal) -> LoginSecurityRecord {
        match self.store.load(principal).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    principal = %principal,
                    "Security store unavailable, assuming no prior attempts"
                );
                LoginSecurityRecord::default()
            }
        }
    }

    async fn persist(&self, principal: &Principal, record: &LoginSecurityRecord) {
        if let Err(e) = self.store.save(principal, record).await {
            tracing::warn!(error = %e, principal = %principal, "Failed to persist security record");
        }
    }
}
