//! Optimistic Update Tracking
//!
//! Clean Architecture structure:
//! - `domain/` - Update records and their lifecycle
//! - `application/` - Update manager and the list convenience built on it
//!
//! A record moves `pending -> success` (payload replaced with server data) or
//! `pending -> failed` (rollback invoked once). Terminal records stay until
//! purged.

pub mod application;
pub mod domain;
pub mod error;

// Re-exports for convenience
pub use application::{Keyed, OptimisticList, OptimisticUpdateManager, Subscription, UpdateStats};
pub use domain::{NewUpdate, UpdateKind, UpdateSnapshot, UpdateStatus};
pub use error::{OptimisticError, OptimisticResult};
pub use kernel::id::UpdateId;
