// shared/src/lib.rs

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The key store call that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    Scan,
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreOp::Scan => write!(f, "scan"),
            StoreOp::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    /// Connection refused, dropped or otherwise unusable
    Connection,
    Timeout,
    /// Reply could not be understood
    Protocol,
    /// The store answered with an error
    Server,
}

/// Failure reported by a key store, tagged with the operation that caused it
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[error("store {op} failed ({kind:?}): {message}")]
pub struct StoreError {
    pub op: StoreOp,
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(op: StoreOp, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            op,
            kind,
            message: message.into(),
        }
    }

    pub fn scan(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self::new(StoreOp::Scan, kind, message)
    }

    pub fn delete(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self::new(StoreOp::Delete, kind, message)
    }
}

pub mod config;
