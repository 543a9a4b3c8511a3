//! Client Core
//!
//! Composition root: wires the request pipeline, the optimistic update
//! manager and the login guard into one explicitly constructed object.
//! Nothing here is global, so every test builds its own isolated core.

pub mod config;
pub mod login;

use std::sync::Arc;

use auth::{
    AuthResult, JsonFileSecurityStore, LoginAttemptGuard, LoginGrant, SecurityStore, SignInInput,
    SignInUseCase,
};
use chrono::{Duration, Utc};
use gateway::{
    ApiClient, Credential, CredentialStore, DedupStats, HttpTransport, TokenRefresher, Transport,
};
use kernel::error::app_error::AppResult;
use optimistic::{OptimisticUpdateManager, UpdateStats};

pub use config::ClientConfig;
pub use login::GatewayLoginBackend;

// Re-export unified error types for callers of the core
pub use kernel::error::{
    app_error::AppError,
    kind::ErrorKind,
};

pub struct ClientCore<T, S> {
    api: ApiClient<T, T>,
    updates: OptimisticUpdateManager,
    guard: Arc<LoginAttemptGuard<S>>,
    sign_in_flow: SignInUseCase<S, GatewayLoginBackend<T>>,
}

impl ClientCore<HttpTransport, JsonFileSecurityStore> {
    /// Production wiring: reqwest transport and a JSON file security store
    pub fn connect(config: &ClientConfig) -> AppResult<Self> {
        let transport = Arc::new(HttpTransport::new(&config.gateway)?);
        let store = Arc::new(JsonFileSecurityStore::new(&config.security_store_path));
        Ok(Self::new(config, transport, store))
    }
}

impl<T, S> ClientCore<T, S>
where
    T: Transport + TokenRefresher + Sync + 'static,
    S: SecurityStore + Sync,
{
    pub fn new(config: &ClientConfig, transport: Arc<T>, store: Arc<S>) -> Self {
        let credentials = Arc::new(CredentialStore::new());
        let api = ApiClient::new(
            &config.gateway,
            transport.clone(),
            transport.clone(),
            credentials,
        );
        let guard = Arc::new(LoginAttemptGuard::new(store, config.guard.clone()));
        let backend = Arc::new(GatewayLoginBackend::new(transport, config.login_path.clone()));

        Self {
            api,
            updates: OptimisticUpdateManager::new(),
            sign_in_flow: SignInUseCase::new(guard.clone(), backend),
            guard,
        }
    }

    pub fn api(&self) -> &ApiClient<T, T> {
        &self.api
    }

    pub fn updates(&self) -> &OptimisticUpdateManager {
        &self.updates
    }

    pub fn guard(&self) -> &LoginAttemptGuard<S> {
        &self.guard
    }

    /// Authenticate through the login guard and start a session
    pub async fn sign_in(&self, input: SignInInput) -> AuthResult<()> {
        let grant = self.sign_in_flow.execute(input).await?;
        self.api.sign_in(credential_from(&grant));
        Ok(())
    }

    /// End the session; throttle records are kept
    pub fn sign_out(&self) {
        self.api.sign_out();
    }

    pub fn cancel_all_requests(&self) -> usize {
        self.api.cancel_all_requests()
    }

    pub fn clear_deduplication_cache(&self) {
        self.api.clear_deduplication_cache();
    }

    pub async fn clear_all_security_data(&self) {
        self.guard.clear_all_security_data().await;
    }

    pub fn deduplication_stats(&self) -> DedupStats {
        self.api.deduplication_stats()
    }

    pub fn update_stats(&self) -> UpdateStats {
        self.updates.stats()
    }
}

fn credential_from(grant: &LoginGrant) -> Credential {
    let expires_at = grant
        .expires_in
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(Duration::try_seconds)
        .map(|lifetime| Utc::now() + lifetime);

    Credential::new(
        grant.access_token.clone(),
        grant.refresh_token.clone(),
        expires_at,
    )
}
