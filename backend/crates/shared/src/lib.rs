//! Shared Kernel - Cross-crate minimal core
//!
//! This crate contains the "smallest core" of vocabulary shared by the
//! request gateway, the optimistic update manager and the login guard:
//! - Common error types and result aliases
//! - Typed ID wrappers
//! - Wall-clock abstraction
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all crates.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod clock;
pub mod id;
