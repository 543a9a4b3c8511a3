//! Application Configuration
//!
//! Configuration for the login guard.

use platform::rate_limit::ThrottleConfig;

/// Login guard configuration
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Failure thresholds, window and lockout length
    pub throttle: ThrottleConfig,
    /// Maximum number of audit entries kept (oldest evicted first)
    pub audit_limit: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig::default(),
            audit_limit: 100,
        }
    }
}

impl GuardConfig {
    /// Create config for development (one-minute lockout)
    pub fn development() -> Self {
        Self {
            throttle: ThrottleConfig {
                lockout: std::time::Duration::from_secs(60),
                ..ThrottleConfig::default()
            },
            ..Default::default()
        }
    }

    /// Get lockout duration in milliseconds
    pub fn lockout_ms(&self) -> i64 {
        self.throttle.lockout_ms()
    }
}
