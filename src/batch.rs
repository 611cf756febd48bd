use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ObligationError, Result};
use crate::types::ObligationId;

/// kind of multi-row write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOperation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchOperation::Create => "create",
            BatchOperation::Update => "update",
            BatchOperation::Delete => "delete",
        };
        f.write_str(label)
    }
}

/// row that stopped a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRow {
    /// None when the backend did not say which row it rejected
    pub id: Option<ObligationId>,
    pub cause: String,
    #[serde(skip)]
    pub error: Option<ObligationError>,
}

/// result of a write that spans several rows without a transaction
///
/// Rows in `succeeded` are committed and stay committed; nothing is rolled
/// back when a later row fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub operation: BatchOperation,
    pub total: usize,
    pub succeeded: Vec<ObligationId>,
    pub failed: Option<FailedRow>,
}

impl BatchOutcome {
    pub fn new(operation: BatchOperation, total: usize) -> Self {
        Self {
            operation,
            total,
            succeeded: Vec::with_capacity(total),
            failed: None,
        }
    }

    /// every row written
    pub fn complete(operation: BatchOperation, ids: Vec<ObligationId>) -> Self {
        Self {
            operation,
            total: ids.len(),
            succeeded: ids,
            failed: None,
        }
    }

    pub fn record_success(&mut self, id: ObligationId) {
        self.succeeded.push(id);
    }

    pub fn record_failure(&mut self, id: Option<ObligationId>, error: &ObligationError) {
        self.failed = Some(FailedRow {
            id,
            cause: error.to_string(),
            error: Some(error.clone()),
        });
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.succeeded.len() == self.total
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    /// a partial outcome becomes `PartialBatchFailure`
    ///
    /// When nothing was committed the original error is returned as is.
    pub fn into_result(self) -> Result<BatchOutcome> {
        if self.is_complete() {
            return Ok(self);
        }
        let (failed_id, cause) = match self.failed {
            Some(FailedRow {
                error: Some(error), ..
            }) if self.succeeded.is_empty() => return Err(error),
            Some(row) => (row.id, row.cause),
            None => (None, "batch ended early".to_string()),
        };
        Err(ObligationError::PartialBatchFailure {
            operation: self.operation,
            succeeded: self.succeeded.len(),
            total: self.total,
            succeeded_ids: self.succeeded,
            failed_id,
            cause,
        })
    }
}
