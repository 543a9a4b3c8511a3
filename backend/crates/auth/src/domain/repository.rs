//! Repository Traits
//!
//! Interfaces for security-record persistence and the login endpoint.
//! Implementations are in infrastructure layer (stores) and the application
//! binary (login backend).

use kernel::error::app_error::AppResult;
use platform::password::ClearTextPassword;

use crate::domain::entity::{failed_attempt::FailedAttempt, login_security::LoginSecurityRecord};
use crate::domain::value_object::{login_grant::LoginGrant, principal::Principal};
use crate::error::AuthResult;

/// Security record store
#[trait_variant::make(SecurityStore: Send)]
pub trait LocalSecurityStore {
    /// Load the record for a principal
    async fn load(&self, principal: &Principal) -> AuthResult<Option<LoginSecurityRecord>>;

    /// Insert or replace the record for a principal
    async fn save(&self, principal: &Principal, record: &LoginSecurityRecord) -> AuthResult<()>;

    /// Delete the record for a principal
    async fn remove(&self, principal: &Principal) -> AuthResult<()>;

    /// Append to the audit log, evicting the oldest entries beyond `limit`
    async fn append_attempt(&self, attempt: &FailedAttempt, limit: usize) -> AuthResult<()>;

    /// Audit entries, oldest first, optionally narrowed to one principal
    async fn attempts(&self, principal: Option<&Principal>) -> AuthResult<Vec<FailedAttempt>>;

    /// Delete every record and the audit log
    async fn clear(&self) -> AuthResult<()>;
}

/// Login endpoint
///
/// A rejected credential must surface as `ErrorKind::AuthRejected`; any other
/// error (network, server fault) is not counted as a failed attempt.
#[trait_variant::make(LoginBackend: Send)]
pub trait LocalLoginBackend {
    async fn authenticate(
        &self,
        principal: &Principal,
        password: &ClearTextPassword,
        captcha_token: Option<&str>,
    ) -> AppResult<LoginGrant>;
}
