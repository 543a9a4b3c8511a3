//! Client Configuration
//!
//! Assembled from the environment (a `.env` file is honoured by the binary).
//!
//! | Variable              | Default                                 |
//! |-----------------------|-----------------------------------------|
//! | `API_BASE_URL`        | `http://localhost:8080/api`             |
//! | `API_REFRESH_PATH`    | `/auth/refresh`                         |
//! | `API_LOGIN_PATH`      | `/auth/login`                           |
//! | `DEDUPE_TTL_MS`       | 2000 (500 in debug builds)              |
//! | `SECURITY_STORE_PATH` | `.client/login-security.json`           |

use std::path::PathBuf;
use std::time::Duration;

use auth::GuardConfig;
use gateway::GatewayConfig;
use kernel::error::app_error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gateway: GatewayConfig,
    pub guard: GuardConfig,
    /// Path of the login endpoint, relative to the base URL
    pub login_path: String,
    /// JSON file holding login security records
    pub security_store_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            guard: GuardConfig::default(),
            login_path: "/auth/login".to_string(),
            security_store_path: PathBuf::from(".client/login-security.json"),
        }
    }
}

impl ClientConfig {
    /// Development configuration (short cache window and lockout)
    pub fn development() -> Self {
        Self {
            gateway: GatewayConfig::development(),
            guard: GuardConfig::development(),
            ..Default::default()
        }
    }

    /// Read the process environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut config = if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::default()
        };

        if let Some(base_url) = lookup("API_BASE_URL") {
            config.gateway.base_url = base_url;
        }
        if let Some(path) = lookup("API_REFRESH_PATH") {
            config.gateway.refresh_path = path;
        }
        if let Some(path) = lookup("API_LOGIN_PATH") {
            config.login_path = path;
        }
        if let Some(raw) = lookup("DEDUPE_TTL_MS") {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                AppError::validation(format!("DEDUPE_TTL_MS must be a number, got {:?}", raw))
            })?;
            config.gateway.dedupe_ttl = Duration::from_millis(millis);
        }
        if let Some(path) = lookup("SECURITY_STORE_PATH") {
            config.security_store_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_from_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("API_BASE_URL", "https://api.example.com"),
            ("API_REFRESH_PATH", "/session/refresh"),
            ("DEDUPE_TTL_MS", "750"),
            ("SECURITY_STORE_PATH", "/tmp/security.json"),
        ]))
        .unwrap();

        assert_eq!(config.gateway.base_url, "https://api.example.com");
        assert_eq!(config.gateway.refresh_path, "/session/refresh");
        assert_eq!(config.gateway.dedupe_ttl_ms(), 750);
        assert_eq!(config.login_path, "/auth/login");
        assert_eq!(config.security_store_path, PathBuf::from("/tmp/security.json"));
    }

    #[test]
    fn test_invalid_ttl_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[("DEDUPE_TTL_MS", "soon")])).unwrap_err();
        assert_eq!(err.kind(), kernel::error::kind::ErrorKind::Validation);
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.gateway.expiry_status, 401);
        assert_eq!(config.guard.audit_limit, 100);
    }
}
