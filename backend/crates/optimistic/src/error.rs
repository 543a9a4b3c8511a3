//! Optimistic Update Error Types

use kernel::error::{app_error::AppError, kind::ErrorKind};
use kernel::id::UpdateId;
use thiserror::Error;

use crate::domain::record::UpdateStatus;

pub type OptimisticResult<T> = Result<T, OptimisticError>;

#[derive(Debug, Error)]
pub enum OptimisticError {
    /// No record with this id (never added, cancelled or purged)
    #[error("Optimistic update not found: {0}")]
    NotFound(UpdateId),

    /// The record already reached a terminal status
    #[error("Optimistic update {id} already settled as {status}")]
    AlreadySettled { id: UpdateId, status: UpdateStatus },

    /// Local item could not be converted to a payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OptimisticError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OptimisticError::NotFound(_) | OptimisticError::AlreadySettled { .. } => {
                ErrorKind::Validation
            }
            OptimisticError::Serialization(_) => ErrorKind::Internal,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            OptimisticError::Serialization(e) => {
                tracing::error!(error = %e, "Optimistic payload serialization failed");
            }
            _ => {
                tracing::debug!(error = %self, "Optimistic update error");
            }
        }
    }
}

impl From<OptimisticError> for AppError {
    fn from(err: OptimisticError) -> Self {
        err.to_app_error()
    }
}
