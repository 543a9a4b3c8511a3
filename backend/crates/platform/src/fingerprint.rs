//! Request fingerprinting
//!
//! Maps an [`ApiRequest`] to a stable identity string used as the
//! deduplication key. The fingerprint is the full canonical serialization of
//! method, normalized path, query and body, never a truncated hash, so two
//! semantically different requests cannot collide.

use std::fmt;

use serde_json::{Map, Value};

use crate::request::{ApiRequest, DedupePolicy};

/// Deduplication key derived from a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint a request, or `None` if it must not be deduplicated
///
/// Reads are fingerprinted unless bypassed; mutations only when the caller
/// opted in with [`ApiRequest::allow_dedupe`].
pub fn fingerprint(request: &ApiRequest) -> Option<RequestFingerprint> {
    let eligible = match request.dedupe_policy() {
        DedupePolicy::Bypass => false,
        DedupePolicy::Allow => true,
        DedupePolicy::Auto => request.is_read(),
    };
    if !eligible {
        return None;
    }
    Some(compute(request))
}

/// Fingerprint without the eligibility policy
pub fn compute(request: &ApiRequest) -> RequestFingerprint {
    // Keys sorted; values of a repeated key keep their relative order
    let mut pairs: Vec<&(String, String)> = request.query_params().iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let query: Vec<Value> = pairs
        .into_iter()
        .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), Value::String(v.clone())]))
        .collect();

    let body = request.body().map(canonicalize).unwrap_or(Value::Null);

    let parts = Value::Array(vec![
        Value::String(request.method().as_str().to_ascii_uppercase()),
        Value::String(normalize_path(request.path())),
        Value::Array(query),
        body,
    ]);

    // Serializing a Value cannot fail.
    RequestFingerprint(parts.to_string())
}

/// Normalize a path: leading slash, no empty segments, no trailing slash
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Recursively rebuild objects with keys in sorted order
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_requests_equal_fingerprints() {
        let a = ApiRequest::get("/users").query("page", 1).query("sort", "name");
        let b = ApiRequest::get("/users?sort=name&page=1");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_path_normalization() {
        assert_eq!(normalize_path("users/"), "/users");
        assert_eq!(normalize_path("//users//42/"), "/users/42");
        assert_eq!(normalize_path("/"), "/");

        let a = ApiRequest::get("/users/42/");
        let b = ApiRequest::get("users//42");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_body_key_order_is_irrelevant() {
        let a = ApiRequest::post("/search")
            .json(json!({"q": "x", "filter": {"b": 1, "a": 2}}))
            .allow_dedupe();
        let b = ApiRequest::post("/search")
            .json(json!({"filter": {"a": 2, "b": 1}, "q": "x"}))
            .allow_dedupe();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_different_requests_differ() {
        let a = ApiRequest::get("/users").query("page", 1);
        let b = ApiRequest::get("/users").query("page", 2);
        let c = ApiRequest::new(http::Method::HEAD, "/users").query("page", 1);
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_no_delimiter_collisions() {
        // A naive "path?query" concatenation would make these equal.
        let a = ApiRequest::get("/a").query("b", "c&d=e");
        let b = ApiRequest::get("/a").query("b", "c").query("d", "e");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_repeated_keys_are_part_of_identity() {
        let both = ApiRequest::get("/items?tag=a&tag=b");
        let last = ApiRequest::get("/items?tag=b");
        assert_ne!(fingerprint(&both), fingerprint(&last));

        let built = ApiRequest::get("/items").query("tag", "a").query("tag", "b");
        assert_eq!(fingerprint(&both), fingerprint(&built));
    }

    #[test]
    fn test_encoded_and_plain_query_match() {
        let encoded = ApiRequest::get("/search?q=a%20b");
        let plain = ApiRequest::get("/search").query("q", "a b");
        assert_eq!(fingerprint(&encoded), fingerprint(&plain));
    }

    #[test]
    fn test_mutations_require_opt_in() {
        let plain = ApiRequest::post("/posts").json(json!({"title": "x"}));
        assert!(fingerprint(&plain).is_none());

        let opted = plain.clone().allow_dedupe();
        assert!(fingerprint(&opted).is_some());
    }

    #[test]
    fn test_bypass_skips_reads() {
        let req = ApiRequest::get("/live").bypass_dedupe();
        assert!(fingerprint(&req).is_none());
    }
}
