//! Credential Entity
//!
//! Access/refresh token pair held by the client. Token material is zeroized
//! on drop and redacted from debug output.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Stored session credential
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    access_token: String,
    refresh_token: Option<String>,
    #[zeroize(skip)]
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the access token is past its advertised lifetime
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Build the credential that replaces this one after a refresh
    ///
    /// A refresh response without a rotated refresh token keeps the old one.
    pub fn refreshed(&self, refreshed: &RefreshedCredential, now: DateTime<Utc>) -> Self {
        Self {
            access_token: refreshed.access_token.clone(),
            refresh_token: refreshed
                .refresh_token
                .clone()
                .or_else(|| self.refresh_token.clone()),
            expires_at: refreshed.expires_at(now),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful refresh call
#[derive(Clone)]
pub struct RefreshedCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<Duration>,
}

impl RefreshedCredential {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| now + d)
    }
}

impl fmt::Debug for RefreshedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedCredential")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was stored after sign-in
    SignedIn,
    /// The credential was refreshed and queued calls are being replayed
    Refreshed,
    /// Refresh failed; the application must re-authenticate
    Expired,
    /// Credentials were cleared by sign-out
    SignedOut,
}
