use crate::domain::FlushResult;
use serde::Serialize;
use shared::StoreError;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    Requested,
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelReason::Requested => write!(f, "cancellation requested"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Why a flush did not run to completion.
///
/// Every variant except `InvalidNamespace` carries the partial result
/// accumulated before the flush stopped. Flushing again is safe.
#[derive(Debug, Clone, Error)]
pub enum FlushError {
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("flush aborted after {} key(s) deleted: {source}", .partial.keys_deleted)]
    Store {
        source: StoreError,
        partial: FlushResult,
    },

    #[error("flush cancelled ({reason}) after {} key(s) deleted", .partial.keys_deleted)]
    Cancelled {
        reason: CancelReason,
        partial: FlushResult,
    },
}

impl FlushError {
    pub fn partial(&self) -> Option<&FlushResult> {
        match self {
            FlushError::InvalidNamespace(_) => None,
            FlushError::Store { partial, .. } | FlushError::Cancelled { partial, .. } => {
                Some(partial)
            }
        }
    }

    /// The store may still hold keys under the namespace
    pub fn is_incomplete(&self) -> bool {
        self.partial().is_some()
    }
}
