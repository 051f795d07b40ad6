use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlushEvent {
    Started(FlushStartedEvent),
    BatchDeleted(BatchDeletedEvent),
    Completed(FlushCompletedEvent),
    Aborted(FlushAbortedEvent),
}

impl FlushEvent {
    pub fn namespace(&self) -> &str {
        match self {
            FlushEvent::Started(e) => &e.namespace,
            FlushEvent::BatchDeleted(e) => &e.namespace,
            FlushEvent::Completed(e) => &e.namespace,
            FlushEvent::Aborted(e) => &e.namespace,
        }
    }

    /// Short name used for filtering and as the SSE event name suffix
    pub fn kind(&self) -> &'static str {
        match self {
            FlushEvent::Started(_) => "started",
            FlushEvent::BatchDeleted(_) => "batch",
            FlushEvent::Completed(_) => "completed",
            FlushEvent::Aborted(_) => "aborted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushStartedEvent {
    pub namespace: String,
    pub pattern: String,
    pub batch_size: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDeletedEvent {
    pub namespace: String,
    pub index: u64,
    pub scanned: usize,
    pub deleted: u64,
    pub failed: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushCompletedEvent {
    pub namespace: String,
    pub keys_deleted: u64,
    pub batches: u64,
    pub errors: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushAbortedEvent {
    pub namespace: String,
    pub keys_deleted: u64,
    pub reason: String,
    pub timestamp: u64,
}

/// Current timestamp in seconds since UNIX epoch
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
