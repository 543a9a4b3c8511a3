//! Gateway Configuration

use std::time::Duration;

/// Request pipeline configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Path of the token refresh endpoint
    pub refresh_path: String,
    /// How long a successful deduplicated result is served from cache
    pub dedupe_ttl: Duration,
    /// HTTP status that signals an expired access credential
    pub expiry_status: u16,
    /// Per-request network timeout
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            dedupe_ttl: Duration::from_secs(2),
            expiry_status: 401,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Development configuration (short cache window for easier debugging)
    pub fn development() -> Self {
        Self {
            dedupe_ttl: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            ..Default::default()
        }
    }

    pub fn with_dedupe_ttl(mut self, ttl: Duration) -> Self {
        self.dedupe_ttl = ttl;
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn dedupe_ttl_ms(&self) -> u64 {
        self.dedupe_ttl.as_millis() as u64
    }
}
