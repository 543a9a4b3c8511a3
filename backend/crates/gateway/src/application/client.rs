//! API Client
//!
//! Entry point for outbound calls. Pipeline:
//! fingerprint -> deduplicate -> send with credential -> refresh on expiry.
//! Replays issued by the refresh coordinator go straight to the transport and
//! are never deduplicated against themselves.

use std::sync::Arc;

use kernel::error::app_error::{AppError, AppResult};
use platform::fingerprint::fingerprint;
use platform::request::{ApiRequest, ApiResponse};
use serde::de::DeserializeOwned;

use crate::application::config::GatewayConfig;
use crate::application::credentials::CredentialStore;
use crate::application::dedup::{DedupStats, RequestDeduplicator};
use crate::application::refresh::{RefreshStats, TokenRefreshCoordinator};
use crate::domain::credential::Credential;
use crate::domain::transport::{TokenRefresher, Transport};

pub struct ApiClient<T, R> {
    dedup: RequestDeduplicator<ApiResponse>,
    coordinator: TokenRefreshCoordinator<T, R>,
}

impl<T, R> Clone for ApiClient<T, R> {
    fn clone(&self) -> Self {
        Self {
            dedup: self.dedup.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<T, R> ApiClient<T, R>
where
    T: Transport + Sync + 'static,
    R: TokenRefresher + Sync + 'static,
{
    pub fn new(
        config: &GatewayConfig,
        transport: Arc<T>,
        refresher: Arc<R>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            dedup: RequestDeduplicator::new(config.dedupe_ttl),
            coordinator: TokenRefreshCoordinator::new(
                transport,
                refresher,
                credentials,
                config.expiry_status,
            ),
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.coordinator.credentials()
    }

    /// Send a request through the full pipeline
    pub async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let Some(fingerprint) = fingerprint(&request) else {
            return self.coordinator.execute(request).await;
        };

        tracing::trace!(fingerprint = %fingerprint, "Dispatching deduplicated request");
        let coordinator = self.coordinator.clone();
        self.dedup
            .dedupe(fingerprint, move || async move { coordinator.execute(request).await })
            .await
    }

    /// Send and decode a JSON body
    pub async fn send_json<D: DeserializeOwned>(&self, request: ApiRequest) -> AppResult<D> {
        let response = self.send(request).await?;
        response.json().map_err(|e| {
            AppError::internal("Unexpected response body")
                .with_status(response.status)
                .with_source(e)
        })
    }

    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> AppResult<D> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Store the credential obtained from sign-in
    pub fn sign_in(&self, credential: Credential) {
        self.credentials().store(credential);
    }

    /// Tear down the session: abort in-flight calls, forget cached results,
    /// drop the credential
    ///
    /// A refresh still running when this is called will not write its result
    /// back.
    pub fn sign_out(&self) {
        let cancelled = self.cancel_all_requests();
        self.clear_deduplication_cache();
        self.credentials().clear();
        tracing::info!(cancelled, "Signed out");
    }

    pub fn cancel_all_requests(&self) -> usize {
        self.dedup.cancel_all()
    }

    pub fn clear_deduplication_cache(&self) {
        self.dedup.clear_cache();
    }

    pub fn deduplication_stats(&self) -> DedupStats {
        self.dedup.stats()
    }

    pub fn refresh_stats(&self) -> RefreshStats {
        self.coordinator.stats()
    }
}
