//! Request / Response Model
//!
//! Transport-neutral description of an outbound API call. The gateway
//! fingerprints, deduplicates and replays these; the concrete transport turns
//! them into wire requests.

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a request may be coalesced with identical concurrent requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupePolicy {
    /// Reads are deduplicated, mutations are not
    #[default]
    Auto,
    /// Caller explicitly opted a mutation into deduplication
    Allow,
    /// Never deduplicate (always hit the transport)
    Bypass,
}

/// Outbound API request descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    /// Decoded pairs in insertion order; repeated keys are kept
    query: Vec<(String, String)>,
    body: Option<Value>,
    dedupe: DedupePolicy,
    retry: bool,
}

impl ApiRequest {
    /// Create a request; a query string embedded in `path` is split off and
    /// percent-decoded into query parameters
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), parse_query(q)),
            None => (path, Vec::new()),
        };

        Self {
            method,
            path,
            query,
            body: None,
            dedupe: DedupePolicy::Auto,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter (unencoded); a repeated key adds a value
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Opt a mutating request into deduplication
    pub fn allow_dedupe(mut self) -> Self {
        self.dedupe = DedupePolicy::Allow;
        self
    }

    /// Always send this request, even if an identical one is in flight
    pub fn bypass_dedupe(mut self) -> Self {
        self.dedupe = DedupePolicy::Bypass;
        self
    }

    /// Mark as a replay after a credential refresh
    pub fn into_retry(mut self) -> Self {
        self.retry = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn dedupe_policy(&self) -> DedupePolicy {
        self.dedupe
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }

    /// Reads (GET, HEAD, OPTIONS, TRACE) are safe to coalesce
    pub fn is_read(&self) -> bool {
        self.method.is_safe()
    }
}

/// Response snapshot returned by a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body into a typed value
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.body)
    }
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
