//! Transport Traits
//!
//! Interfaces to the network. Implementation is in infrastructure layer.

use kernel::error::app_error::AppResult;
use platform::request::{ApiRequest, ApiResponse};

use crate::domain::credential::RefreshedCredential;

/// Executes a single wire request
///
/// Any HTTP response (including 4xx/5xx) is returned as `Ok`; only
/// network-level failures are errors, so the caller can tell an expired
/// credential apart from a dead connection.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    async fn send(&self, request: &ApiRequest, access_token: Option<&str>)
    -> AppResult<ApiResponse>;
}

/// Exchanges a refresh token for a new credential
#[trait_variant::make(TokenRefresher: Send)]
pub trait LocalTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshedCredential>;
}
