//! Domain Layer

pub mod record;

// Re-exports
pub use record::{NewUpdate, Rollback, UpdateKind, UpdateSnapshot, UpdateStatus};
