//! Application Layer
//!
//! Login guard and the sign-in use case built on it.

pub mod config;
pub mod login_guard;
pub mod sign_in;

// Re-exports
pub use config::GuardConfig;
pub use login_guard::LoginAttemptGuard;
pub use sign_in::{SignInInput, SignInUseCase};
