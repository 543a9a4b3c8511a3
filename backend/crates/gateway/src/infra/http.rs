//! HTTP Transport (reqwest)

use std::time::Duration;

use kernel::error::app_error::{AppError, AppResult};
use platform::fingerprint::normalize_path;
use platform::request::{ApiRequest, ApiResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::config::GatewayConfig;
use crate::domain::credential::RefreshedCredential;
use crate::domain::transport::{TokenRefresher, Transport};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequestBody<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponseBody {
    #[serde(alias = "access_token")]
    access_token: String,
    #[serde(default, alias = "refresh_token")]
    refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default, alias = "expires_in")]
    expires_in: Option<u64>,
}

/// reqwest-backed transport and refresher
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    refresh_path: String,
}

impl HttpTransport {
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            refresh_path: config.refresh_path.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> AppResult<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method().clone(), self.url(request.path()));

        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            status,
            retry = request.is_retry(),
            "HTTP request completed"
        );

        Ok(ApiResponse::new(status, decode_body(&bytes)))
    }
}

impl TokenRefresher for HttpTransport {
    async fn refresh(&self, refresh_token: &str) -> AppResult<RefreshedCredential> {
        let response = self
            .client
            .post(self.url(&self.refresh_path))
            .json(&RefreshRequestBody { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http(status.as_u16(), "Refresh endpoint rejected the request"));
        }

        let body: RefreshResponseBody = response.json().await?;
        Ok(RefreshedCredential {
            access_token: body.access_token,
            refresh_token: body.refresh_token,
            expires_in: body.expires_in.map(Duration::from_secs),
        })
    }
}

/// JSON when possible, raw text otherwise, `null` for an empty body
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
