//! Entity Module

pub mod failed_attempt;
pub mod login_security;
