//! JSON File Security Store
//!
//! Keeps security records and the audit log in a single JSON document so
//! lockouts survive a restart. The file is read on first use and rewritten
//! atomically (temp file + rename) after every change.

use std::collections::{BTreeMap, VecDeque};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::entity::{failed_attempt::FailedAttempt, login_security::LoginSecurityRecord};
use crate::domain::repository::SecurityStore;
use crate::domain::value_object::principal::Principal;
use crate::error::AuthResult;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecurityDocument {
    #[serde(default)]
    records: BTreeMap<Principal, LoginSecurityRecord>,
    #[serde(default)]
    failed_attempts: VecDeque<FailedAttempt>,
}

pub struct JsonFileSecurityStore {
    path: PathBuf,
    document: Mutex<Option<SecurityDocument>>,
}

impl JsonFileSecurityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> AuthResult<SecurityDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(SecurityDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(SecurityDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &SecurityDocument) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::trace!(path = %self.path.display(), "Security store written");
        Ok(())
    }

    /// Run `f` against the loaded document; persist when it reports a change
    async fn with_document<R>(
        &self,
        f: impl FnOnce(&mut SecurityDocument) -> (R, bool),
    ) -> AuthResult<R> {
        let mut guard = self.document.lock().await;
        if guard.is_none() {
            let loaded = self.read_document().await?;
            *guard = Some(loaded);
        }
        let document = guard.get_or_insert_with(SecurityDocument::default);

        let (result, changed) = f(document);
        if changed {
            self.write_document(document).await?;
        }
        Ok(result)
    }
}

impl SecurityStore for JsonFileSecurityStore {
    async fn load(&self, principal: &Principal) -> AuthResult<Option<LoginSecurityRecord>> {
        self.with_document(|doc| (doc.records.get(principal).cloned(), false))
            .await
    }

    async fn save(&self, principal: &Principal, record: &LoginSecurityRecord) -> AuthResult<()> {
        self.with_document(|doc| {
            doc.records.insert(principal.clone(), record.clone());
            ((), true)
        })
        .await
    }

    async fn remove(&self, principal: &Principal) -> AuthResult<()> {
        self.with_document(|doc| ((), doc.records.remove(principal).is_some()))
            .await
    }

    async fn append_attempt(&self, attempt: &FailedAttempt, limit: usize) -> AuthResult<()> {
        self.with_document(|doc| {
            doc.failed_attempts.push_back(attempt.clone());
            while doc.failed_attempts.len() > limit {
                doc.failed_attempts.pop_front();
            }
            ((), true)
        })
        .await
    }

    async fn attempts(&self, principal: Option<&Principal>) -> AuthResult<Vec<FailedAttempt>> {
        self.with_document(|doc| {
            let attempts = doc
                .failed_attempts
                .iter()
                .filter(|a| principal.is_none_or(|p| &a.principal == p))
                .cloned()
                .collect();
            (attempts, false)
        })
        .await
    }

    async fn clear(&self) -> AuthResult<()> {
        self.with_document(|doc| {
            *doc = SecurityDocument::default();
            ((), true)
        })
        .await
    }
}
