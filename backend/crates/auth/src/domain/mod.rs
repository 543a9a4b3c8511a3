//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    failed_attempt::FailedAttempt,
    login_security::{LockStatus, LoginSecurityRecord},
};
pub use repository::{LoginBackend, SecurityStore};
pub use value_object::{login_grant::LoginGrant, principal::Principal};
