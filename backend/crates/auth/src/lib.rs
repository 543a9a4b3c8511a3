//! Auth: client-side login protection
//!
//! Clean Architecture structure:
//! - `domain/` - Security records, audit entries, store and backend traits
//! - `application/` - Login attempt guard and sign-in use case
//! - `infra/` - In-memory and JSON file stores
//!
//! ## Policy
//! - Captcha demanded from the 2nd consecutive failure
//! - 15 minute lockout from the 3rd; failures during a lockout do not extend it
//! - Counter forgiven after an hour without attempts
//! - Audit log bounded to the last 100 failures

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

// Re-exports for convenience
pub use application::{GuardConfig, LoginAttemptGuard, SignInInput, SignInUseCase};
pub use domain::{
    FailedAttempt, LockStatus, LoginBackend, LoginGrant, LoginSecurityRecord, Principal,
    SecurityStore,
};
pub use error::{AuthError, AuthResult};
pub use infra::{JsonFileSecurityStore, MemorySecurityStore};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
