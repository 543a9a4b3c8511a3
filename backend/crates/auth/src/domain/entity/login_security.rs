//! Login Security Entity
//!
//! Per-principal throttle state: failure count, lockout and captcha flag.

use chrono::{DateTime, Utc};
use platform::rate_limit::ThrottleConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSecurityRecord {
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub requires_captcha: bool,
}

/// Lock state with the remaining time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStatus {
    pub locked: bool,
    pub remaining_ms: Option<i64>,
    /// `remaining_ms` rounded up to whole minutes
    pub remaining_minutes: Option<i64>,
}

impl LockStatus {
    pub fn unlocked() -> Self {
        Self {
            locked: false,
            remaining_ms: None,
            remaining_minutes: None,
        }
    }
}

impl LoginSecurityRecord {
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Lockout that has run out but was never cleared
    pub fn lock_expired(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now >= until)
    }

    pub fn lock_status(&self, now: DateTime<Utc>) -> LockStatus {
        match self.locked_until {
            Some(until) if now < until => {
                let remaining_ms = (until - now).num_milliseconds();
                LockStatus {
                    locked: true,
                    remaining_ms: Some(remaining_ms),
                    remaining_minutes: Some((remaining_ms + 59_999) / 60_000),
                }
            }
            _ => LockStatus::unlocked(),
        }
    }

    /// Count one more failure
    ///
    /// A locked record is returned unchanged so failures during a lockout do
    /// not extend it. A gap longer than the window forgives earlier failures.
    /// Returns `false` when nothing changed.
    pub fn register_failure(&mut self, now: DateTime<Utc>, config: &ThrottleConfig) -> bool {
        if self.is_locked(now) {
            return false;
        }

        if self
            .last_attempt_at
            .is_some_and(|last| config.window_elapsed(last, now))
        {
            self.attempts = 0;
        }

        self.attempts += 1;
        self.last_attempt_at = Some(now);

        if config.should_lock(self.attempts) {
            self.locked_until = Some(config.lockout_until(now));
        }
        if config.should_challenge(self.attempts) {
            self.requires_captcha = true;
        }
        true
    }

    /// Drop an expired lockout; attempts and captcha flag stay
    pub fn clear_expired_lock(&mut self, now: DateTime<Utc>) -> bool {
        if self.lock_expired(now) {
            self.locked_until = None;
            return true;
        }
        false
    }
}
