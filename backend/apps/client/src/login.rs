//! Login backend over the gateway transport
//!
//! The login call carries no bearer token and bypasses the refresh
//! coordinator: a 401 here means bad credentials, not an expired session.

use std::sync::Arc;

use auth::{LoginBackend, LoginGrant, Principal};
use gateway::Transport;
use kernel::error::app_error::{AppError, AppResult};
use platform::password::ClearTextPassword;
use platform::request::{ApiRequest, ApiResponse};
use serde_json::json;

pub struct GatewayLoginBackend<T> {
    transport: Arc<T>,
    path: String,
}

impl<T> GatewayLoginBackend<T> {
    pub fn new(transport: Arc<T>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }
}

impl<T: Transport + Sync> LoginBackend for GatewayLoginBackend<T> {
    async fn authenticate(
        &self,
        principal: &Principal,
        password: &ClearTextPassword,
        captcha_token: Option<&str>,
    ) -> AppResult<LoginGrant> {
        let request = ApiRequest::post(self.path.as_str()).json(json!({
            "email": principal.as_str(),
            "password": password.expose_secret(),
            "captchaToken": captcha_token,
        }));
        let response = self.transport.send(&request, None).await?;
        into_grant(response)
    }
}

fn into_grant(response: ApiResponse) -> AppResult<LoginGrant> {
    let status = response.status;
    if response.is_success() {
        return response.json().map_err(|e| {
            AppError::internal("Unexpected login response")
                .with_status(status)
                .with_source(e)
        });
    }

    let message = response
        .body
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string);
    match status {
        401 | 403 => Err(AppError::auth_rejected(
            message.unwrap_or_else(|| "Invalid email or password".to_string()),
        )
        .with_status(status)),
        _ => Err(AppError::http(
            status,
            message.unwrap_or_else(|| format!("Login failed with status {}", status)),
        )),
    }
}
