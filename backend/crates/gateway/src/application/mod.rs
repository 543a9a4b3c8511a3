//! Application Layer
//!
//! Deduplication, refresh coordination and the client pipeline built on them.

pub mod client;
pub mod config;
pub mod credentials;
pub mod dedup;
pub mod refresh;

// Re-exports
pub use client::ApiClient;
pub use config::GatewayConfig;
pub use credentials::{CredentialStore, Generation};
pub use dedup::{DedupStats, RequestDeduplicator};
pub use refresh::{RefreshStats, TokenRefreshCoordinator};
