//! Credential Store
//!
//! Shared holder of the current credential. Every sign-in or sign-out bumps a
//! generation counter; a refresh started under an older generation is not
//! allowed to write its result back, so sign-out always wins.

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::domain::credential::{Credential, RefreshedCredential, SessionEvent};

const EVENT_CAPACITY: usize = 16;

/// Opaque generation marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Default)]
struct StoreState {
    credential: Option<Credential>,
    generation: u64,
}

pub struct CredentialStore {
    state: RwLock<StoreState>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: RwLock::new(StoreState::default()),
            events,
        }
    }

    /// Receive session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn current(&self) -> Option<Credential> {
        self.state.read().credential.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .credential
            .as_ref()
            .map(|c| c.access_token().to_string())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .credential
            .as_ref()
            .and_then(|c| c.refresh_token().map(str::to_string))
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().credential.is_some()
    }

    pub fn generation(&self) -> Generation {
        Generation(self.state.read().generation)
    }

    /// Store a freshly issued credential (sign-in)
    pub fn store(&self, credential: Credential) {
        {
            let mut state = self.state.write();
            state.generation += 1;
            state.credential = Some(credential);
        }
        tracing::debug!("Credential stored");
        let _ = self.events.send(SessionEvent::SignedIn);
    }

    /// Write back a refresh result if no sign-in/sign-out happened meanwhile
    ///
    /// Returns `false` when the result was discarded.
    pub fn commit_refresh(&self, expected: Generation, refreshed: &RefreshedCredential) -> bool {
        {
            let mut state = self.state.write();
            if state.generation != expected.0 {
                tracing::debug!("Discarding refresh result from a previous session");
                return false;
            }
            let Some(current) = state.credential.as_ref() else {
                return false;
            };
            state.credential = Some(current.refreshed(refreshed, Utc::now()));
        }
        let _ = self.events.send(SessionEvent::Refreshed);
        true
    }

    /// Drop the credential after a failed refresh
    pub fn expire(&self, expected: Generation) {
        {
            let mut state = self.state.write();
            if state.generation != expected.0 {
                return;
            }
            state.generation += 1;
            state.credential = None;
        }
        tracing::info!("Session expired, credentials cleared");
        let _ = self.events.send(SessionEvent::Expired);
    }

    /// Drop the credential (sign-out)
    pub fn clear(&self) {
        {
            let mut state = self.state.write();
            state.generation += 1;
            state.credential = None;
        }
        tracing::debug!("Credentials cleared");
        let _ = self.events.send(SessionEvent::SignedOut);
    }
}
