//! Sign In Use Case
//!
//! Consults the login guard, calls the login backend and feeds the outcome
//! back into the guard. Only credential rejections count as failed attempts.

use std::sync::Arc;

use kernel::error::kind::ErrorKind;
use platform::password::ClearTextPassword;

use crate::application::login_guard::LoginAttemptGuard;
use crate::domain::repository::{LoginBackend, SecurityStore};
use crate::domain::value_object::{login_grant::LoginGrant, principal::Principal};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    /// Email address
    pub identifier: String,
    pub password: ClearTextPassword,
    /// Required once the guard demands a captcha
    pub captcha_token: Option<String>,
}

pub struct SignInUseCase<S, B> {
    guard: Arc<LoginAttemptGuard<S>>,
    backend: Arc<B>,
}

impl<S, B> SignInUseCase<S, B>
where
    S: SecurityStore + Sync,
    B: LoginBackend + Sync,
{
    pub fn new(guard: Arc<LoginAttemptGuard<S>>, backend: Arc<B>) -> Self {
        Self { guard, backend }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<LoginGrant> {
        let result = self.try_sign_in(input).await;
        if let Err(e) = &result {
            e.log();
        }
        result
    }

    async fn try_sign_in(&self, input: SignInInput) -> AuthResult<LoginGrant> {
        let principal = Principal::new(&input.identifier)
            .map_err(|e| AuthError::InvalidPrincipal(e.message().to_string()))?;

        let lock = self.guard.is_account_locked(&principal).await;
        if lock.locked {
            return Err(AuthError::AccountLocked {
                remaining_minutes: lock.remaining_minutes.unwrap_or(1),
            });
        }

        let captcha = input.captcha_token.as_deref().filter(|t| !t.trim().is_empty());
        if captcha.is_none() && self.guard.requires_captcha(&principal).await {
            return Err(AuthError::CaptchaRequired);
        }

        match self
            .backend
            .authenticate(&principal, &input.password, captcha)
            .await
        {
            Ok(grant) => {
                self.guard.record_successful_login(&principal).await;
                tracing::info!(principal = %principal, "User signed in");
                Ok(grant)
            }
            Err(e) if e.kind() == ErrorKind::AuthRejected => {
                let record = self.guard.record_failed_attempt(&principal).await;
                let lock = self.guard.is_account_locked(&principal).await;
                if lock.locked {
                    return Err(AuthError::AccountLocked {
                        remaining_minutes: lock.remaining_minutes.unwrap_or(1),
                    });
                }
                tracing::debug!(attempts = record.attempts, "Credentials rejected");
                Err(AuthError::InvalidCredentials)
            }
            Err(e) => Err(AuthError::Backend(e)),
        }
    }
}
