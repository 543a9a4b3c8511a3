//! Principal Value Object
//!
//! Login identifier (an email address) used to key security records.
//! Normalized so `Alice@Example.com ` and `alice@example.com` share a record.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RFC 5321 upper bound for an address
const PRINCIPAL_MAX_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let principal = raw.as_ref().trim().to_lowercase();

        if principal.is_empty() {
            return Err(AppError::validation("Login identifier cannot be empty"));
        }
        if principal.len() > PRINCIPAL_MAX_LENGTH {
            return Err(AppError::validation(format!(
                "Login identifier must be at most {} characters",
                PRINCIPAL_MAX_LENGTH
            )));
        }
        if principal.chars().any(char::is_whitespace) {
            return Err(AppError::validation("Login identifier cannot contain spaces"));
        }

        Ok(Self(principal))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let a = Principal::new("  Alice@Example.COM ").unwrap();
        let b = Principal::new("alice@example.com").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "alice@example.com");
    }

    #[test]
    fn test_rejects_empty_and_spaces() {
        assert!(Principal::new("   ").is_err());
        assert!(Principal::new("a b@example.com").is_err());
        assert!(Principal::new("x".repeat(255)).is_err());
    }
}
