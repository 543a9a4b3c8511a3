//! Gateway: resilient outbound request pipeline
//!
//! Clean Architecture structure:
//! - `domain/` - Credential entity, session events, transport traits
//! - `application/` - Deduplicator, refresh coordinator, API client
//! - `infra/` - reqwest transport
//!
//! ## Guarantees
//! - Identical concurrent requests reach the network once
//! - At most one credential refresh runs at a time
//! - Calls parked behind a refresh are settled exactly once, in arrival order
//! - A replayed call that is rejected again fails; it never triggers a second refresh
//! - Sign-out wins over a refresh that is still running

pub mod application;
pub mod domain;
pub mod infra;

// Re-exports for convenience
pub use application::{
    ApiClient, CredentialStore, DedupStats, GatewayConfig, RefreshStats, RequestDeduplicator,
    TokenRefreshCoordinator,
};
pub use domain::{Credential, RefreshedCredential, SessionEvent, TokenRefresher, Transport};
pub use infra::HttpTransport;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
