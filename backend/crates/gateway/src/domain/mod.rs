//! Domain Layer
//!
//! Credential entity, session events and the transport traits.

pub mod credential;
pub mod transport;

// Re-exports
pub use credential::{Credential, RefreshedCredential, SessionEvent};
pub use transport::{Transport, TokenRefresher};
