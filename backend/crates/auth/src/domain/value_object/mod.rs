//! Value Object Module

pub mod login_grant;
pub mod principal;
