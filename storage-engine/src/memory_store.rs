use crate::glob::glob_match;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared::StoreError;
use std::collections::{BTreeMap, HashMap};
use sweep::{Cursor, DeleteOutcome, KeyBatch, KeyStore};

#[derive(Default)]
struct Inner {
    // key -> (insertion sequence, value)
    entries: HashMap<String, (u64, Vec<u8>)>,
    // insertion sequence -> key; cursors are sequence numbers, so deletes
    // never shift the position of keys not yet visited
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

/// In-memory key store with Redis-like scan semantics.
///
/// `scan` examines at most `limit` entries per call and returns the ones
/// matching the pattern, so a batch may be empty while the cursor still
/// points further into the keyspace.
#[derive(Default)]
pub struct MemoryKeyStore {
    inner: RwLock<Inner>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key. Overwrites keep the key's scan position.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        let mut inner = self.inner.write();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.1 = value;
            return;
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(key, (seq, value));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in scan order
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().order.values().cloned().collect()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn scan(
        &self,
        pattern: &str,
        cursor: Cursor,
        limit: usize,
    ) -> Result<KeyBatch, StoreError> {
        let start = match cursor {
            Cursor::Start => 0,
            Cursor::At(seq) => seq,
            Cursor::End => return Ok(KeyBatch::last(Vec::new())),
        };

        let inner = self.inner.read();
        let mut remaining = inner.order.range(start..);
        let keys = remaining
            .by_ref()
            .take(limit.max(1))
            .filter(|(_, key)| glob_match(pattern, key))
            .map(|(_, key)| key.clone())
            .collect();

        let next = match remaining.next() {
            Some((seq, _)) => Cursor::At(*seq),
            None => Cursor::End,
        };

        Ok(KeyBatch::new(keys, next))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.write();
        let mut deleted = 0;

        for key in keys {
            if let Some((seq, _)) = inner.entries.remove(key) {
                inner.order.remove(&seq);
                deleted += 1;
            }
        }

        Ok(DeleteOutcome::deleted(deleted))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemoryKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
