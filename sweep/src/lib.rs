//! Namespace-scoped cache invalidation.
//!
//! [`NamespaceFlusher`] removes every key under a prefix by walking the
//! keyspace in bounded batches through a [`KeyStore`], recording per-batch
//! failures instead of giving up on the first one.

pub mod domain;
pub mod error;
pub mod events;
pub mod planes;
pub mod ports;

pub use domain::{
    Cursor, DeleteOutcome, FailureTarget, FlushControl, FlushFailure, FlushOptions, FlushResult,
    KeyBatch, Namespace,
};
pub use error::{CancelReason, FlushError};
pub use events::FlushEvent;
pub use planes::data::{FlushOperations, NamespaceFlusher};
pub use ports::KeyStore;
pub use tokio_util::sync::CancellationToken;
