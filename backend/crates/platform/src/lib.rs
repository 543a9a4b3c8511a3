//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Transport-neutral request/response model
//! - Request fingerprinting (deduplication keys)
//! - Password strength scoring and zeroized password handling
//! - Sliding-window throttle policy

pub mod fingerprint;
pub mod password;
pub mod rate_limit;
pub mod request;
