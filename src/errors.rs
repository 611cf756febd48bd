use thiserror::Error;
use uuid::Uuid;

use crate::batch::BatchOperation;
use crate::types::ObligationId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObligationError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("obligation not found: {id}")]
    NotFound {
        id: Uuid,
    },

    #[error("{operation} stopped after {succeeded} of {total} instances: {cause}")]
    PartialBatchFailure {
        operation: BatchOperation,
        succeeded: usize,
        total: usize,
        succeeded_ids: Vec<ObligationId>,
        failed_id: Option<ObligationId>,
        cause: String,
    },

    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl ObligationError {
    pub fn validation(message: impl Into<String>) -> Self {
        ObligationError::Validation {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        ObligationError::BackendUnavailable {
            message: message.into(),
        }
    }

    /// true for errors raised before any write was attempted
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ObligationError::Validation { .. }
                | ObligationError::NotFound { .. }
                | ObligationError::InvalidConfiguration { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ObligationError>;
