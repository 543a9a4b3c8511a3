//! Sliding-Window Throttling
//!
//! Policy for counting repeated failures per key. The window slides with the
//! last event: the counter is forgiven once the gap since the previous event
//! exceeds the window, not at a fixed clock boundary.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Throttle configuration
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Failures at which a challenge (captcha) is demanded
    pub challenge_after: u32,
    /// Failures at which the key is locked out
    pub lock_after: u32,
    /// Gap after which the failure counter is forgiven
    pub window: Duration,
    /// How long a lockout lasts
    pub lockout: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            challenge_after: 2,
            lock_after: 3,
            window: Duration::from_secs(3600),  // 1 hour
            lockout: Duration::from_secs(15 * 60), // 15 minutes
        }
    }
}

impl ThrottleConfig {
    pub fn new(challenge_after: u32, lock_after: u32, window_secs: u64, lockout_secs: u64) -> Self {
        Self {
            challenge_after,
            lock_after,
            window: Duration::from_secs(window_secs),
            lockout: Duration::from_secs(lockout_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    pub fn lockout_ms(&self) -> i64 {
        self.lockout.as_millis() as i64
    }

    /// Whether the gap since `last` is long enough to forgive earlier failures
    pub fn window_elapsed(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last).num_milliseconds() > self.window_ms()
    }

    /// End of a lockout starting at `now`
    pub fn lockout_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::milliseconds(self.lockout_ms())
    }

    pub fn should_challenge(&self, failures: u32) -> bool {
        failures >= self.challenge_after
    }

    pub fn should_lock(&self, failures: u32) -> bool {
        failures >= self.lock_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = ThrottleConfig::default();
        assert!(!config.should_challenge(1));
        assert!(config.should_challenge(2));
        assert!(!config.should_lock(2));
        assert!(config.should_lock(3));
    }

    #[test]
    fn test_window_slides_from_last_event() {
        let config = ThrottleConfig::default();
        let last = Utc::now();

        assert!(!config.window_elapsed(last, last + chrono::Duration::minutes(59)));
        assert!(!config.window_elapsed(last, last + chrono::Duration::hours(1)));
        assert!(config.window_elapsed(last, last + chrono::Duration::minutes(61)));
    }

    #[test]
    fn test_lockout_until() {
        let config = ThrottleConfig::new(2, 3, 3600, 900);
        let now = Utc::now();
        assert_eq!(config.lockout_until(now), now + chrono::Duration::minutes(15));
    }
}
