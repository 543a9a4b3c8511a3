//! Application Layer

pub mod collection;
pub mod manager;

// Re-exports
pub use collection::{Keyed, OptimisticList};
pub use manager::{OptimisticUpdateManager, Subscription, UpdateStats};
