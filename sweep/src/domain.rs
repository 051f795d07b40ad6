use crate::error::FlushError;
use serde::{Deserialize, Serialize};
use shared::StoreError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Characters with special meaning in store match patterns
const GLOB_METACHARACTERS: [char; 5] = ['*', '?', '[', ']', '\\'];

/// A non-empty key prefix identifying one logical partition of the keyspace
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(prefix: impl Into<String>) -> Result<Self, FlushError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(FlushError::InvalidNamespace(
                "namespace cannot be empty".to_string(),
            ));
        }
        Ok(Self(prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Glob pattern matching every key under this prefix.
    ///
    /// Metacharacters inside the prefix are escaped so `a*:` only ever
    /// matches keys that literally start with `a*:`.
    pub fn match_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.0.len() + 1);
        for c in self.0.chars() {
            if GLOB_METACHARACTERS.contains(&c) {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position within a paginated enumeration of the keyspace
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Start,
    At(u64),
    End,
}

impl Cursor {
    pub fn is_end(&self) -> bool {
        matches!(self, Cursor::End)
    }
}

/// Keys returned by one scan step plus where to continue from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBatch {
    pub keys: Vec<String>,
    pub next: Cursor,
}

impl KeyBatch {
    pub fn new(keys: Vec<String>, next: Cursor) -> Self {
        Self { keys, next }
    }

    /// Final batch of an enumeration
    pub fn last(keys: Vec<String>) -> Self {
        Self::new(keys, Cursor::End)
    }
}

/// Result of one bulk delete; `failures` lists the keys the store refused
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: u64,
    pub failures: Vec<(String, StoreError)>,
}

impl DeleteOutcome {
    pub fn deleted(deleted: u64) -> Self {
        Self {
            deleted,
            failures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureTarget {
    Key { key: String },
    /// Zero-based scan cycle whose delete failed as a whole
    Batch { index: u64, size: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushFailure {
    pub target: FailureTarget,
    pub cause: StoreError,
}

/// Outcome of one flush call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushResult {
    pub keys_deleted: u64,
    /// Scan cycles completed
    pub batches: u64,
    pub errors: Vec<FlushFailure>,
}

impl FlushResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Flusher-wide policy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushOptions {
    pub batch_size: usize,
    pub deadline: Option<Duration>,
}

impl FlushOptions {
    pub const DEFAULT_BATCH_SIZE: usize = 500;

    pub fn new(batch_size: usize, deadline: Option<Duration>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            deadline,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BATCH_SIZE, None)
    }
}

/// Per-call controls; unset fields fall back to the flusher's options
#[derive(Clone, Debug, Default)]
pub struct FlushControl {
    pub cancel: CancellationToken,
    pub deadline: Option<Duration>,
    pub batch_size: Option<usize>,
}

impl FlushControl {
    pub fn with_cancel(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}
