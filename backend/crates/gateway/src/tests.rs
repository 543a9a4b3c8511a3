//! Pipeline tests for the gateway crate
//! Scenarios run on a paused clock against an in-memory transport.

#[cfg(test)]
mod support {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use platform::request::{ApiRequest, ApiResponse};
    use serde_json::json;

    use crate::application::{ApiClient, CredentialStore, GatewayConfig};
    use crate::domain::credential::{Credential, RefreshedCredential};
    use crate::domain::transport::{TokenRefresher, Transport};
    use kernel::error::app_error::{AppError, AppResult};

    #[derive(Debug, Clone, PartialEq)]
    pub struct Sent {
        pub method: String,
        pub path: String,
        pub token: Option<String>,
        pub retry: bool,
    }

    /// Accepts exactly one access token; everything else is a 401
    #[derive(Default)]
    pub struct ScriptedTransport {
        pub accepted_token: Mutex<String>,
        pub delays: Mutex<HashMap<String, Duration>>,
        pub log: Mutex<Vec<Sent>>,
    }

    impl ScriptedTransport {
        pub fn accepting(token: &str) -> Self {
            let transport = Self::default();
            *transport.accepted_token.lock() = token.to_string();
            transport
        }

        pub fn with_delay(self, path: &str, delay: Duration) -> Self {
            self.delays.lock().insert(path.to_string(), delay);
            self
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.log.lock().clone()
        }

        pub fn retries(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter(|s| s.retry)
                .map(|s| s.path)
                .collect()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: &ApiRequest,
            access_token: Option<&str>,
        ) -> AppResult<ApiResponse> {
            self.log.lock().push(Sent {
                method: request.method().to_string(),
                path: request.path().to_string(),
                token: access_token.map(str::to_string),
                retry: request.is_retry(),
            });

            let authorized = access_token == Some(self.accepted_token.lock().as_str());
            let delay = self.delays.lock().get(request.path()).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            match request.path() {
                "/boom" => Err(AppError::transport("connection refused")),
                "/missing" => Ok(ApiResponse::new(404, json!({ "message": "Not found" }))),
                _ if !authorized => Ok(ApiResponse::new(401, json!({ "message": "expired" }))),
                path => Ok(ApiResponse::ok(json!({
                    "path": path,
                    "token": access_token,
                }))),
            }
        }
    }

    /// Hands out a fixed token after a delay, fails, or panics
    pub struct FakeRefresher {
        pub issue: Option<String>,
        pub delay: Duration,
        pub panics: bool,
        pub calls: AtomicUsize,
    }

    impl FakeRefresher {
        pub fn issuing(token: &str) -> Self {
            Self {
                issue: Some(token.to_string()),
                delay: Duration::from_millis(100),
                panics: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                issue: None,
                delay: Duration::from_millis(100),
                panics: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn panicking() -> Self {
            Self {
                panics: true,
                ..Self::failing()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, _refresh_token: &str) -> AppResult<RefreshedCredential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.panics {
                panic!("refresh endpoint returned garbage");
            }
            match &self.issue {
                Some(token) => Ok(RefreshedCredential {
                    access_token: token.clone(),
                    refresh_token: Some("rotated".to_string()),
                    expires_in: Some(Duration::from_secs(900)),
                }),
                None => Err(AppError::http(400, "refresh token revoked")),
            }
        }
    }

    pub type TestClient = ApiClient<ScriptedTransport, FakeRefresher>;

    pub fn client(
        transport: ScriptedTransport,
        refresher: FakeRefresher,
        credential: Option<Credential>,
    ) -> (TestClient, Arc<ScriptedTransport>, Arc<FakeRefresher>) {
        let transport = Arc::new(transport);
        let refresher = Arc::new(refresher);
        let credentials = Arc::new(CredentialStore::new());
        if let Some(credential) = credential {
            credentials.store(credential);
        }
        let client = ApiClient::new(
            &GatewayConfig::default(),
            Arc::clone(&transport),
            Arc::clone(&refresher),
            credentials,
        );
        (client, transport, refresher)
    }

    pub fn stale() -> Option<Credential> {
        Some(Credential::new("stale", Some("refresh-1".to_string()), None))
    }
}

#[cfg(test)]
mod dedupe_pipeline_tests {
    use super::support::*;
    use platform::request::ApiRequest;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_identical_reads_hit_transport_once() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/users", Duration::from_millis(50));
        let credential = Some(gateway_credential("fresh"));
        let (client, transport, _) = client(transport, FakeRefresher::issuing("x"), credential);

        let (a, b, c) = tokio::join!(
            client.send(ApiRequest::get("/users").query("page", 1)),
            client.send(ApiRequest::get("users/").query("page", "1")),
            client.send(ApiRequest::get("/users?page=1")),
        );

        assert_eq!(transport.sent().len(), 1);
        let a = a.unwrap();
        assert_eq!(a, b.unwrap());
        assert_eq!(a, c.unwrap());
        assert_eq!(client.deduplication_stats().cached, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_are_not_coalesced_by_default() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/orders", Duration::from_millis(50));
        let (client, transport, _) = client(
            transport,
            FakeRefresher::issuing("x"),
            Some(gateway_credential("fresh")),
        );

        let body = json!({ "sku": "A-1", "qty": 1 });
        let (a, b) = tokio::join!(
            client.send(ApiRequest::post("/orders").json(body.clone())),
            client.send(ApiRequest::post("/orders").json(body.clone())),
        );
        tokio_test::assert_ok!(a);
        tokio_test::assert_ok!(b);
        assert_eq!(transport.sent().len(), 2);
        assert!(transport.sent().iter().all(|s| s.method == "POST"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_opted_in_mutations_are_coalesced() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/orders", Duration::from_millis(50));
        let (client, transport, _) = client(
            transport,
            FakeRefresher::issuing("x"),
            Some(gateway_credential("fresh")),
        );

        let request = ApiRequest::post("/orders")
            .json(json!({ "qty": 1, "sku": "A-1" }))
            .allow_dedupe();
        let (a, b) = tokio::join!(client.send(request.clone()), client.send(request));
        tokio_test::assert_ok!(a);
        tokio_test::assert_ok!(b);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_read_served_within_ttl() {
        let (client, transport, _) = client(
            ScriptedTransport::accepting("fresh"),
            FakeRefresher::issuing("x"),
            Some(gateway_credential("fresh")),
        );

        client.send(ApiRequest::get("/profile")).await.unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        client.send(ApiRequest::get("/profile")).await.unwrap();
        assert_eq!(transport.sent().len(), 1);

        client.clear_deduplication_cache();
        client.send(ApiRequest::get("/profile")).await.unwrap();
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_requests() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/slow", Duration::from_secs(30));
        let (client, _, _) = client(
            transport,
            FakeRefresher::issuing("x"),
            Some(gateway_credential("fresh")),
        );

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/slow")).await }
        });
        tokio::task::yield_now().await;

        assert_eq!(client.cancel_all_requests(), 1);
        let err = pending.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(client.deduplication_stats().in_flight, 0);
    }

    fn gateway_credential(token: &str) -> crate::domain::credential::Credential {
        crate::domain::credential::Credential::new(token, Some("refresh-1".to_string()), None)
    }
}

#[cfg(test)]
mod refresh_pipeline_tests {
    use super::support::*;
    use crate::domain::credential::SessionEvent;
    use kernel::error::app_error::AppError;
    use kernel::error::kind::ErrorKind;
    use platform::request::ApiRequest;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_expiry_triggers_single_refresh() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/a", Duration::from_millis(10))
            .with_delay("/b", Duration::from_millis(20))
            .with_delay("/c", Duration::from_millis(30));
        let (client, transport, refresher) =
            client(transport, FakeRefresher::issuing("fresh"), stale());

        let (a, b, c) = tokio::join!(
            client.send(ApiRequest::get("/a")),
            client.send(ApiRequest::get("/b")),
            client.send(ApiRequest::get("/c")),
        );

        assert_eq!(refresher.calls(), 1);
        assert_eq!(a.unwrap().body["token"], "fresh");
        assert_eq!(b.unwrap().body["token"], "fresh");
        assert_eq!(c.unwrap().body["token"], "fresh");

        // Replayed once each, in arrival order, with the new credential
        assert_eq!(transport.retries(), vec!["/a", "/b", "/c"]);
        assert!(
            transport
                .sent()
                .iter()
                .all(|s| s.token.as_deref() == Some(if s.retry { "fresh" } else { "stale" }))
        );
        assert_eq!(client.refresh_stats().queued, 0);
        assert!(!client.refresh_stats().in_progress);
        assert_eq!(client.credentials().refresh_token().as_deref(), Some("rotated"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_request_refreshes_and_replays_once() {
        let (client, transport, refresher) = client(
            ScriptedTransport::accepting("fresh"),
            FakeRefresher::issuing("fresh"),
            stale(),
        );

        let (a, b) = tokio::join!(
            client.send(ApiRequest::get("/me")),
            client.send(ApiRequest::get("/me")),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(refresher.calls(), 1);
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(transport.retries(), vec!["/me"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_rejects_queue_and_clears_session() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/a", Duration::from_millis(10))
            .with_delay("/b", Duration::from_millis(20));
        let (client, transport, refresher) = client(transport, FakeRefresher::failing(), stale());
        let mut events = client.credentials().subscribe();

        let (a, b) = tokio::join!(
            client.send(ApiRequest::get("/a")),
            client.send(ApiRequest::get("/b")),
        );

        let a = a.unwrap_err();
        let b = b.unwrap_err();
        assert_eq!(a.kind(), ErrorKind::AuthRejected);
        assert_eq!(b.kind(), ErrorKind::AuthRejected);
        assert!(a.requires_reauthentication());

        assert_eq!(refresher.calls(), 1);
        assert!(transport.retries().is_empty());
        assert!(!client.credentials().is_authenticated());
        assert_eq!(events.recv().await.ok(), Some(SessionEvent::Expired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_replay_does_not_refresh_again() {
        // The refresher hands out a token the server still refuses
        let (client, transport, refresher) = client(
            ScriptedTransport::accepting("server-only"),
            FakeRefresher::issuing("fresh"),
            stale(),
        );

        let err = client.send(ApiRequest::get("/a")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AuthRejected);
        assert_eq!(err.status(), Some(401));
        assert_eq!(refresher.calls(), 1);
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_refresh_token_fails_without_calling_refresher() {
        let credential = crate::domain::credential::Credential::new("stale", None, None);
        let (client, _, refresher) = client(
            ScriptedTransport::accepting("fresh"),
            FakeRefresher::issuing("fresh"),
            Some(credential),
        );

        let err = client.send(ApiRequest::get("/a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthRejected);
        let cause = std::error::Error::source(&err)
            .and_then(|e| e.downcast_ref::<AppError>())
            .map(AppError::kind);
        assert_eq!(cause, Some(ErrorKind::AuthExpired));
        assert_eq!(refresher.calls(), 0);
        assert!(!client.credentials().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_expiry_after_refresh_replays_without_second_refresh() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/slow", Duration::from_millis(300))
            .with_delay("/fast", Duration::from_millis(10));
        let (client, transport, refresher) =
            client(transport, FakeRefresher::issuing("fresh"), stale());

        let (slow, fast) = tokio::join!(
            client.send(ApiRequest::get("/slow")),
            client.send(ApiRequest::get("/fast")),
        );

        assert!(slow.is_ok() && fast.is_ok());
        assert_eq!(refresher.calls(), 1);
        assert_eq!(transport.retries(), vec!["/fast", "/slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_during_refresh_is_authoritative() {
        let (client, _, refresher) = client(
            ScriptedTransport::accepting("fresh"),
            FakeRefresher::issuing("fresh"),
            stale(),
        );

        let coalesced = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/a")).await }
        });
        let bypassing = tokio::spawn({
            let client = client.clone();
            async move { client.send(ApiRequest::get("/b").bypass_dedupe()).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(client.refresh_stats().in_progress);
        client.sign_out();

        assert!(coalesced.await.unwrap().unwrap_err().is_cancelled());
        let err = bypassing.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthRejected);

        assert_eq!(refresher.calls(), 1);
        assert!(!client.credentials().is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_refresher_still_settles_queue() {
        let transport = ScriptedTransport::accepting("fresh")
            .with_delay("/a", Duration::from_millis(10))
            .with_delay("/b", Duration::from_millis(20));
        let (client, _, refresher) = client(transport, FakeRefresher::panicking(), stale());

        let (a, b) = tokio::time::timeout(Duration::from_secs(3600), async {
            tokio::join!(
                client.send(ApiRequest::get("/a")),
                client.send(ApiRequest::get("/b")),
            )
        })
        .await
        .expect("queued calls must settle");

        assert_eq!(a.unwrap_err().kind(), ErrorKind::AuthRejected);
        assert_eq!(b.unwrap_err().kind(), ErrorKind::AuthRejected);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(client.refresh_stats().queued, 0);
        assert!(!client.refresh_stats().in_progress);
        assert!(!client.credentials().is_authenticated());

        // The coordinator is idle again: a later expiry is not parked forever
        let later = tokio::time::timeout(
            Duration::from_secs(3600),
            client.send(ApiRequest::post("/c")),
        )
        .await
        .expect("coordinator must not stay busy");
        assert_eq!(later.unwrap_err().kind(), ErrorKind::AuthRejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_pass_through_without_refresh() {
        let (client, _, refresher) = client(
            ScriptedTransport::accepting("fresh"),
            FakeRefresher::issuing("fresh"),
            stale(),
        );

        let missing = client.send(ApiRequest::get("/missing")).await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Http);
        assert_eq!(missing.status(), Some(404));
        assert_eq!(missing.message(), "Not found");

        let boom = client.send(ApiRequest::get("/boom")).await.unwrap_err();
        assert_eq!(boom.kind(), ErrorKind::Transport);
        assert!(boom.kind().is_retryable());

        assert_eq!(refresher.calls(), 0);
    }
}
