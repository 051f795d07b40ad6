#![deny(clippy::all)]

use crate::domain::{Cursor, DeleteOutcome, KeyBatch};
use async_trait::async_trait;
use shared::StoreError;

// Ports are the pluggable extension points for the underlying key-value store

/// Port for the two capabilities a namespace flush needs from a store
#[async_trait]
pub trait KeyStore: Send + Sync + 'static {
    /// Return up to `limit` units of work worth of keys matching the glob
    /// `pattern`, continuing from `cursor`. A batch whose `next` is
    /// [`Cursor::End`] is the last one.
    async fn scan(&self, pattern: &str, cursor: Cursor, limit: usize)
    -> Result<KeyBatch, StoreError>;

    /// Best-effort bulk delete. Keys that could not be removed are listed in
    /// the outcome; `Err` means the call as a whole failed.
    async fn delete_many(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "store"
    }
}
