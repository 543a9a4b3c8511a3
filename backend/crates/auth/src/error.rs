//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Identifier failed validation
    #[error("Invalid login identifier: {0}")]
    InvalidPrincipal(String),

    /// Server rejected the credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts
    #[error("Account is temporarily locked, try again in {remaining_minutes} minute(s)")]
    AccountLocked { remaining_minutes: i64 },

    /// A captcha token must accompany the next attempt
    #[error("Captcha verification required")]
    CaptchaRequired,

    /// Login endpoint unreachable or failing (not counted as an attempt)
    #[error("Login backend error: {0}")]
    Backend(AppError),

    /// Security store I/O failure
    #[error("Security store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Security store content could not be (de)serialized
    #[error("Security store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidPrincipal(_) | AuthError::CaptchaRequired => ErrorKind::Validation,
            AuthError::InvalidCredentials | AuthError::AccountLocked { .. } => {
                ErrorKind::AuthRejected
            }
            AuthError::Backend(e) => e.kind(),
            AuthError::Io(_) | AuthError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = AppError::new(self.kind(), self.to_string());
        match self {
            AuthError::AccountLocked { .. } => err.with_action("Wait for the lockout to expire"),
            AuthError::CaptchaRequired => err.with_action("Complete the captcha and retry"),
            _ => err,
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            AuthError::Io(e) => {
                tracing::error!(error = %e, "Security store I/O error");
            }
            AuthError::Serialization(e) => {
                tracing::error!(error = %e, "Security store serialization error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountLocked { remaining_minutes } => {
                tracing::warn!(remaining_minutes, "Login attempt on locked account");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.to_app_error()
    }
}
