//! Redis key store
//!
//! Enumerates with `SCAN cursor MATCH pattern COUNT limit` so the server never
//! blocks on a full keyspace walk, and removes keys with a multi-key `DEL`.
//! When the server rejects a multi-key `DEL` (e.g. `CROSSSLOT` on a cluster
//! proxy), the batch is retried key by key and refused keys are reported
//! individually.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError};
use shared::{StoreError, StoreErrorKind, StoreOp};
use sweep::{Cursor, DeleteOutcome, KeyBatch, KeyStore};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub struct RedisKeyStore {
    client: Client,
    // Created on first use; the manager reconnects on its own afterwards
    connection: OnceCell<ConnectionManager>,
}

impl RedisKeyStore {
    /// Create a store for a connection URL such as `redis://localhost:6379`.
    /// No connection is attempted until the first call.
    pub fn new(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| {
            StoreError::new(
                StoreOp::Scan,
                StoreErrorKind::Connection,
                format!("invalid redis url '{}': {}", url, e),
            )
        })?;

        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self, op: StoreOp) -> Result<ConnectionManager, StoreError> {
        self.connection
            .get_or_try_init(|| async {
                debug!("Opening redis connection");
                ConnectionManager::new(self.client.clone()).await
            })
            .await
            .cloned()
            .map_err(|e| classify(op, &e))
    }

    /// Round-trip a `PING`
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection(StoreOp::Scan).await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(StoreOp::Scan, &e))?;
        Ok(())
    }

    async fn delete_one_by_one(
        &self,
        conn: &mut ConnectionManager,
        keys: &[String],
    ) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for key in keys {
            let deleted: Result<u64, RedisError> =
                redis::cmd("DEL").arg(key).query_async(&mut *conn).await;
            match deleted {
                Ok(count) => outcome.deleted += count,
                Err(e) => outcome
                    .failures
                    .push((key.clone(), classify(StoreOp::Delete, &e))),
            }
        }
        outcome
    }
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn scan(
        &self,
        pattern: &str,
        cursor: Cursor,
        limit: usize,
    ) -> Result<KeyBatch, StoreError> {
        let Some(raw_cursor) = to_redis_cursor(cursor) else {
            return Ok(KeyBatch::last(Vec::new()));
        };

        let mut conn = self.connection(StoreOp::Scan).await?;
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(raw_cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(limit.max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| classify(StoreOp::Scan, &e))?;

        Ok(KeyBatch::new(keys, from_redis_cursor(next)))
    }

    async fn delete_many(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError> {
        if keys.is_empty() {
            return Ok(DeleteOutcome::default());
        }

        let mut conn = self.connection(StoreOp::Delete).await?;
        let deleted: Result<u64, RedisError> =
            redis::cmd("DEL").arg(keys).query_async(&mut conn).await;

        match deleted {
            Ok(count) => Ok(DeleteOutcome::deleted(count)),
            Err(e) => {
                let err = classify(StoreOp::Delete, &e);
                if err.kind == StoreErrorKind::Server && keys.len() > 1 {
                    warn!(
                        "Multi-key DEL of {} keys rejected ({}), retrying key by key",
                        keys.len(),
                        err.message
                    );
                    Ok(self.delete_one_by_one(&mut conn, keys).await)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn name(&self) -> &str {
        "redis"
    }
}

impl std::fmt::Debug for RedisKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKeyStore")
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

/// `None` once the enumeration is over
fn to_redis_cursor(cursor: Cursor) -> Option<u64> {
    match cursor {
        Cursor::Start => Some(0),
        Cursor::At(position) => Some(position),
        Cursor::End => None,
    }
}

// Redis signals the end of a SCAN by handing back cursor 0
fn from_redis_cursor(raw: u64) -> Cursor {
    if raw == 0 { Cursor::End } else { Cursor::At(raw) }
}

fn classify(op: StoreOp, err: &RedisError) -> StoreError {
    StoreError::new(op, kind_of(err), err.to_string())
}

// Only `Server` rejections make `delete_many` fall back to per-key deletes
fn kind_of(err: &RedisError) -> StoreErrorKind {
    if err.is_timeout() {
        return StoreErrorKind::Timeout;
    }
    if err.is_connection_dropped() || err.is_connection_refusal() {
        return StoreErrorKind::Connection;
    }
    match err.kind() {
        ErrorKind::Io
        | ErrorKind::AuthenticationFailed
        | ErrorKind::InvalidClientConfig
        | ErrorKind::ClusterConnectionNotFound
        | ErrorKind::MasterNameNotFoundBySentinel
        | ErrorKind::NoValidReplicasFoundBySentinel
        | ErrorKind::EmptySentinelList => StoreErrorKind::Connection,
        ErrorKind::Server(_) | ErrorKind::Extension => StoreErrorKind::Server,
        ErrorKind::Parse | ErrorKind::UnexpectedReturnType | ErrorKind::RESP3NotSupported => {
            StoreErrorKind::Protocol
        }
        _ => StoreErrorKind::Protocol,
    }
}
