//! Token Refresh Coordinator
//!
//! Single-flight credential refresh. The first call that hits the expiry
//! status starts a refresh; every call that hits it while the refresh is
//! running is parked in a FIFO queue. When the refresh settles the queue is
//! drained exactly once: replayed in arrival order on success, rejected with
//! an authentication error on failure.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::join_all;
use kernel::error::app_error::{AppError, AppResult};
use parking_lot::Mutex;
use platform::request::{ApiRequest, ApiResponse};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::application::credentials::CredentialStore;
use crate::domain::credential::RefreshedCredential;
use crate::domain::transport::{TokenRefresher, Transport};

struct QueuedCall {
    request: ApiRequest,
    reply: oneshot::Sender<AppResult<ApiResponse>>,
}

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    queue: VecDeque<QueuedCall>,
}

enum Admission {
    Queued(oneshot::Receiver<AppResult<ApiResponse>>),
    /// The credential already changed since the request was sent
    ReplayNow,
}

/// Snapshot of coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshStats {
    pub in_progress: bool,
    pub queued: usize,
    pub refreshes: u64,
}

pub struct TokenRefreshCoordinator<T, R> {
    transport: Arc<T>,
    refresher: Arc<R>,
    credentials: Arc<CredentialStore>,
    state: Arc<Mutex<RefreshState>>,
    refreshes: Arc<AtomicU64>,
    expiry_status: u16,
}

impl<T, R> Clone for TokenRefreshCoordinator<T, R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            refresher: Arc::clone(&self.refresher),
            credentials: Arc::clone(&self.credentials),
            state: Arc::clone(&self.state),
            refreshes: Arc::clone(&self.refreshes),
            expiry_status: self.expiry_status,
        }
    }
}

impl<T, R> TokenRefreshCoordinator<T, R>
where
    T: Transport + Sync + 'static,
    R: TokenRefresher + Sync + 'static,
{
    pub fn new(
        transport: Arc<T>,
        refresher: Arc<R>,
        credentials: Arc<CredentialStore>,
        expiry_status: u16,
    ) -> Self {
        Self {
            transport,
            refresher,
            credentials,
            state: Arc::new(Mutex::new(RefreshState::default())),
            refreshes: Arc::new(AtomicU64::new(0)),
            expiry_status,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    pub fn stats(&self) -> RefreshStats {
        let state = self.state.lock();
        RefreshStats {
            in_progress: state.in_progress,
            queued: state.queue.len(),
            refreshes: self.refreshes.load(Ordering::Relaxed),
        }
    }

    /// Send a request, transparently recovering from an expired credential
    pub async fn execute(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let sent_with = self.credentials.access_token();
        let response = self.transport.send(&request, sent_with.as_deref()).await?;

        if response.status != self.expiry_status {
            return into_result(response);
        }

        if request.is_retry() {
            return Err(self.rejected_after_retry(&request));
        }

        match self.admit(request.clone(), sent_with) {
            Admission::Queued(reply) => match reply.await {
                Ok(result) => result,
                Err(_) => Err(AppError::cancelled("Queued request was abandoned")),
            },
            Admission::ReplayNow => self.replay(request).await,
        }
    }

    /// Park the request behind the refresh, starting one if none is running
    fn admit(&self, request: ApiRequest, sent_with: Option<String>) -> Admission {
        let (start, receiver) = {
            let mut state = self.state.lock();

            if !state.in_progress {
                let current = self.credentials.access_token();
                if current.is_some() && current != sent_with {
                    tracing::debug!(path = %request.path(), "Credential already refreshed, replaying");
                    return Admission::ReplayNow;
                }
            }

            let (reply, receiver) = oneshot::channel();
            state.queue.push_back(QueuedCall { request, reply });

            let start = !state.in_progress;
            state.in_progress = true;
            tracing::debug!(queued = state.queue.len(), "Request parked behind credential refresh");
            (start, receiver)
        };

        if start {
            let coordinator = self.clone();
            tokio::spawn(async move { coordinator.run_refresh().await });
        }
        Admission::Queued(receiver)
    }

    async fn run_refresh(self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let generation = self.credentials.generation();
        tracing::info!("Refreshing access credential");

        let outcome = match self.credentials.refresh_token() {
            None => {
                self.credentials.expire(generation);
                Err(AppError::auth_rejected("Session expired")
                    .with_source(AppError::auth_expired("No refresh credential available")))
            }
            Some(refresh_token) => match self.refresh_guarded(&refresh_token).await {
                Ok(refreshed) => {
                    if self.credentials.commit_refresh(generation, &refreshed) {
                        Ok(())
                    } else {
                        Err(AppError::auth_rejected("Signed out during credential refresh"))
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Credential refresh failed");
                    self.credentials.expire(generation);
                    Err(AppError::auth_rejected("Session expired").with_source(err))
                }
            },
        };

        // Drained exactly once, under the same lock that admits new calls
        let queued: Vec<QueuedCall> = {
            let mut state = self.state.lock();
            state.in_progress = false;
            state.queue.drain(..).collect()
        };

        match outcome {
            Ok(()) => {
                tracing::info!(replayed = queued.len(), "Credential refreshed, replaying queued requests");
                let replays = queued.into_iter().map(|call| {
                    let coordinator = self.clone();
                    async move {
                        let result = coordinator.replay(call.request).await;
                        let _ = call.reply.send(result);
                    }
                });
                join_all(replays).await;
            }
            Err(err) => {
                tracing::warn!(rejected = queued.len(), "Rejecting requests queued behind failed refresh");
                for call in queued {
                    let _ = call.reply.send(Err(err.clone()));
                }
            }
        }
    }

    /// A panicking refresher counts as a failed refresh so the queue still drains
    async fn refresh_guarded(&self, refresh_token: &str) -> AppResult<RefreshedCredential> {
        match AssertUnwindSafe(self.refresher.refresh(refresh_token))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Credential refresher panicked");
                Err(AppError::internal("Credential refresher panicked"))
            }
        }
    }

    /// Resend once with the current credential; a second expiry is final
    async fn replay(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let request = request.into_retry();
        let token = self.credentials.access_token();
        let response = self.transport.send(&request, token.as_deref()).await?;

        if response.status == self.expiry_status {
            return Err(self.rejected_after_retry(&request));
        }
        into_result(response)
    }

    fn rejected_after_retry(&self, request: &ApiRequest) -> AppError {
        tracing::warn!(path = %request.path(), "Credential rejected after refresh");
        AppError::auth_rejected("Credential rejected after refresh").with_status(self.expiry_status)
    }
}

/// Map non-2xx responses to an HTTP error
fn into_result(response: ApiResponse) -> AppResult<ApiResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let message = response
        .body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", response.status));
    Err(AppError::http(response.status, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::error::kind::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_into_result_uses_server_message() {
        let err = into_result(ApiResponse::new(404, json!({ "message": "No such user" })))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.message(), "No such user");
    }

    #[test]
    fn test_into_result_passes_success() {
        let response = into_result(ApiResponse::ok(json!({ "id": 1 }))).unwrap();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_into_result_default_message() {
        let err = into_result(ApiResponse::new(503, Value::Null)).unwrap_err();
        assert_eq!(err.message(), "Request failed with status 503");
    }
}
