use crate::domain::{
    Cursor, FailureTarget, FlushControl, FlushFailure, FlushOptions, FlushResult, Namespace,
};
use crate::error::{CancelReason, FlushError};
use crate::events::{
    BatchDeletedEvent, FlushAbortedEvent, FlushCompletedEvent, FlushEvent, FlushStartedEvent,
    now_timestamp,
};
use crate::planes::data::operation::FlushOperations;
use crate::ports::KeyStore;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deletes every key under a namespace by alternating bounded scans and
/// batch deletes until the store reports the end of the keyspace.
///
/// Holds no per-flush state; one instance can serve concurrent flushes.
#[derive(Clone)]
pub struct NamespaceFlusher {
    store: Arc<dyn KeyStore>,
    options: FlushOptions,
    event_broadcaster: Option<broadcast::Sender<FlushEvent>>,
}

impl NamespaceFlusher {
    pub fn new(store: Arc<dyn KeyStore>, options: FlushOptions) -> Self {
        Self {
            store,
            options,
            event_broadcaster: None,
        }
    }

    pub fn with_event_broadcaster(
        store: Arc<dyn KeyStore>,
        options: FlushOptions,
        broadcaster: broadcast::Sender<FlushEvent>,
    ) -> Self {
        Self {
            store,
            options,
            event_broadcaster: Some(broadcaster),
        }
    }

    async fn run(
        &self,
        namespace: &Namespace,
        control: &FlushControl,
    ) -> Result<FlushResult, FlushError> {
        let pattern = namespace.match_pattern();
        let batch_size = control.batch_size.unwrap_or(self.options.batch_size).max(1);
        let deadline = control
            .deadline
            .or(self.options.deadline)
            .map(|d| Instant::now() + d);

        let mut result = FlushResult::default();
        let mut cursor = Cursor::Start;

        info!(
            "Flushing namespace '{}' on {} (pattern={}, batch_size={})",
            namespace,
            self.store.name(),
            pattern,
            batch_size
        );
        self.emit(FlushEvent::Started(FlushStartedEvent {
            namespace: namespace.to_string(),
            pattern: pattern.clone(),
            batch_size,
            timestamp: now_timestamp(),
        }));

        loop {
            let scan = self.store.scan(&pattern, cursor, batch_size);
            let batch = match guarded(control, deadline, scan).await {
                Ok(Ok(batch)) => batch,
                Ok(Err(source)) => {
                    return Err(self.abort(
                        namespace,
                        FlushError::Store {
                            source,
                            partial: result,
                        },
                    ));
                }
                Err(reason) => {
                    return Err(self.abort(
                        namespace,
                        FlushError::Cancelled {
                            reason,
                            partial: result,
                        },
                    ));
                }
            };

            let index = result.batches;
            result.batches += 1;

            let scanned = batch.keys.len();
            let mut deleted = 0;
            let mut failed = 0;

            if !batch.keys.is_empty() {
                let delete = self.store.delete_many(&batch.keys);
                match guarded(control, deadline, delete).await {
                    Ok(Ok(outcome)) => {
                        deleted = outcome.deleted;
                        failed = outcome.failures.len();
                        result.keys_deleted += outcome.deleted;
                        for (key, cause) in outcome.failures {
                            warn!("Failed to delete key '{}': {}", key, cause);
                            result.errors.push(FlushFailure {
                                target: FailureTarget::Key { key },
                                cause,
                            });
                        }
                    }
                    Ok(Err(cause)) => {
                        warn!(
                            "Delete of batch {} ({} keys) in namespace '{}' failed: {}",
                            index, scanned, namespace, cause
                        );
                        failed = scanned;
                        result.errors.push(FlushFailure {
                            target: FailureTarget::Batch {
                                index,
                                size: scanned,
                            },
                            cause,
                        });
                    }
                    Err(reason) => {
                        return Err(self.abort(
                            namespace,
                            FlushError::Cancelled {
                                reason,
                                partial: result,
                            },
                        ));
                    }
                }
            }

            debug!(
                "Namespace '{}' batch {}: scanned={}, deleted={}, failed={}",
                namespace, index, scanned, deleted, failed
            );
            self.emit(FlushEvent::BatchDeleted(BatchDeletedEvent {
                namespace: namespace.to_string(),
                index,
                scanned,
                deleted,
                failed,
                timestamp: now_timestamp(),
            }));

            if batch.next.is_end() {
                break;
            }
            cursor = batch.next;
        }

        info!(
            "Flushed namespace '{}': {} key(s) deleted in {} batch(es), {} error(s)",
            namespace,
            result.keys_deleted,
            result.batches,
            result.errors.len()
        );
        self.emit(FlushEvent::Completed(FlushCompletedEvent {
            namespace: namespace.to_string(),
            keys_deleted: result.keys_deleted,
            batches: result.batches,
            errors: result.errors.len(),
            timestamp: now_timestamp(),
        }));

        Ok(result)
    }

    fn abort(&self, namespace: &Namespace, err: FlushError) -> FlushError {
        warn!("Flush of namespace '{}' stopped early: {}", namespace, err);
        self.emit(FlushEvent::Aborted(FlushAbortedEvent {
            namespace: namespace.to_string(),
            keys_deleted: err.partial().map(|p| p.keys_deleted).unwrap_or_default(),
            reason: err.to_string(),
            timestamp: now_timestamp(),
        }));
        err
    }

    fn emit(&self, event: FlushEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            let kind = event.kind();
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    debug!(
                        "Broadcasted {} event to {} subscriber(s)",
                        kind, subscriber_count
                    );
                }
                Err(_) => {
                    debug!("No subscribers for {} event", kind);
                }
            }
        }
    }
}

/// Run one store call unless the flush was cancelled or ran out of time,
/// racing the call against both.
async fn guarded<F, T>(
    control: &FlushControl,
    deadline: Option<Instant>,
    call: F,
) -> Result<T, CancelReason>
where
    F: Future<Output = T>,
{
    if control.cancel.is_cancelled() {
        return Err(CancelReason::Requested);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Err(CancelReason::DeadlineExceeded);
    }

    let expiry = async {
        match deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = control.cancel.cancelled() => Err(CancelReason::Requested),
        _ = expiry => Err(CancelReason::DeadlineExceeded),
        out = call => Ok(out),
    }
}

#[async_trait]
impl FlushOperations for NamespaceFlusher {
    async fn flush(&self, namespace: &str) -> Result<FlushResult, FlushError> {
        self.flush_with(namespace, &FlushControl::default()).await
    }

    async fn flush_with(
        &self,
        namespace: &str,
        control: &FlushControl,
    ) -> Result<FlushResult, FlushError> {
        let namespace =
            Namespace::new(namespace).inspect_err(|e| warn!("Rejected flush: {}", e))?;
        self.run(&namespace, control).await
    }
}

impl std::fmt::Debug for NamespaceFlusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceFlusher")
            .field("store", &self.store.name())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeleteOutcome, KeyBatch};
    use shared::{StoreError, StoreErrorKind};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Scan {
            pattern: String,
            cursor: Cursor,
            limit: usize,
        },
        Delete(Vec<String>),
    }

    /// Store that replays canned responses and records every call
    #[derive(Default)]
    struct ScriptedStore {
        scans: Mutex<VecDeque<Result<KeyBatch, StoreError>>>,
        deletes: Mutex<VecDeque<Result<DeleteOutcome, StoreError>>>,
        calls: Mutex<Vec<Call>>,
        cancel_on_delete: Option<CancellationToken>,
        delete_delay: Option<Duration>,
    }

    impl ScriptedStore {
        fn with_scans(scans: Vec<Result<KeyBatch, StoreError>>) -> Self {
            Self {
                scans: Mutex::new(scans.into()),
                ..Self::default()
            }
        }

        fn with_deletes(self, deletes: Vec<Result<DeleteOutcome, StoreError>>) -> Self {
            *self.deletes.lock().unwrap() = deletes.into();
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn scan_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Scan { .. }))
                .count()
        }
    }

    #[async_trait]
    impl KeyStore for ScriptedStore {
        async fn scan(
            &self,
            pattern: &str,
            cursor: Cursor,
            limit: usize,
        ) -> Result<KeyBatch, StoreError> {
            self.calls.lock().unwrap().push(Call::Scan {
                pattern: pattern.to_string(),
                cursor,
                limit,
            });
            let next = self.scans.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(KeyBatch::last(Vec::new())))
        }

        async fn delete_many(&self, keys: &[String]) -> Result<DeleteOutcome, StoreError> {
            self.calls.lock().unwrap().push(Call::Delete(keys.to_vec()));
            if let Some(delay) = self.delete_delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(ref token) = self.cancel_on_delete {
                token.cancel();
            }
            let next = self.deletes.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(DeleteOutcome::deleted(keys.len() as u64)))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn keys(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}{i}")).collect()
    }

    fn three_batches() -> Vec<Result<KeyBatch, StoreError>> {
        vec![
            Ok(KeyBatch::new(keys("app:", 0..2), Cursor::At(2))),
            Ok(KeyBatch::new(keys("app:", 2..5), Cursor::At(5))),
            Ok(KeyBatch::last(keys("app:", 5..6))),
        ]
    }

    fn flusher(store: Arc<ScriptedStore>) -> NamespaceFlusher {
        NamespaceFlusher::new(store, FlushOptions::default().with_batch_size(3))
    }

    #[tokio::test]
    async fn test_flush_deletes_every_batch() {
        let store = Arc::new(ScriptedStore::with_scans(three_batches()));
        let result = flusher(store.clone()).flush("app:").await.unwrap();

        assert_eq!(result.keys_deleted, 6);
        assert_eq!(result.batches, 3);
        assert!(result.is_clean());

        let scan = |cursor| Call::Scan {
            pattern: "app:*".to_string(),
            cursor,
            limit: 3,
        };
        assert_eq!(
            store.calls(),
            vec![
                scan(Cursor::Start),
                Call::Delete(keys("app:", 0..2)),
                scan(Cursor::At(2)),
                Call::Delete(keys("app:", 2..5)),
                scan(Cursor::At(5)),
                Call::Delete(keys("app:", 5..6)),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_flush_finds_nothing() {
        let store = Arc::new(ScriptedStore::with_scans(three_batches()));
        let flusher = flusher(store.clone());

        flusher.flush("app:").await.unwrap();
        let second = flusher.flush("app:").await.unwrap();

        assert_eq!(second, FlushResult {
            keys_deleted: 0,
            batches: 1,
            errors: Vec::new(),
        });
    }

    #[tokio::test]
    async fn test_empty_namespace_never_touches_store() {
        let store = Arc::new(ScriptedStore::with_scans(three_batches()));
        let err = flusher(store.clone()).flush("").await.unwrap_err();

        assert!(matches!(err, FlushError::InvalidNamespace(_)));
        assert!(err.partial().is_none());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_is_recorded_and_loop_continues() {
        let cause = StoreError::delete(StoreErrorKind::Timeout, "timed out");
        let store = Arc::new(
            ScriptedStore::with_scans(three_batches()).with_deletes(vec![
                Ok(DeleteOutcome::deleted(2)),
                Err(cause.clone()),
                Ok(DeleteOutcome::deleted(1)),
            ]),
        );

        let result = flusher(store.clone()).flush("app:").await.unwrap();

        assert_eq!(store.scan_count(), 3);
        assert_eq!(result.keys_deleted, 3);
        assert_eq!(result.errors, vec![FlushFailure {
            target: FailureTarget::Batch { index: 1, size: 3 },
            cause,
        }]);
    }

    #[tokio::test]
    async fn test_failed_scan_aborts_with_partial_result() {
        let store = Arc::new(ScriptedStore::with_scans(vec![
            Ok(KeyBatch::new(keys("app:", 0..2), Cursor::At(2))),
            Err(StoreError::scan(StoreErrorKind::Connection, "connection reset")),
            Ok(KeyBatch::last(keys("app:", 2..4))),
        ]));

        let err = flusher(store.clone()).flush("app:").await.unwrap_err();

        match err {
            FlushError::Store { source, partial } => {
                assert_eq!(source.kind, StoreErrorKind::Connection);
                assert_eq!(partial.keys_deleted, 2);
                assert_eq!(partial.batches, 1);
            }
            other => panic!("expected store error, got {other:?}"),
        }
        assert_eq!(store.scan_count(), 2);
        assert_eq!(store.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_cancel_after_first_batch_stops_store_calls() {
        let token = CancellationToken::new();
        let store = Arc::new(ScriptedStore {
            cancel_on_delete: Some(token.clone()),
            ..ScriptedStore::with_scans(three_batches())
        });

        let err = flusher(store.clone())
            .flush_with("app:", &FlushControl::with_cancel(token))
            .await
            .unwrap_err();

        match err {
            FlushError::Cancelled { reason, partial } => {
                assert_eq!(reason, CancelReason::Requested);
                assert_eq!(partial.keys_deleted, 2);
                assert_eq!(partial.batches, 1);
                assert!(partial.is_clean());
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_issues_no_calls() {
        let token = CancellationToken::new();
        token.cancel();
        let store = Arc::new(ScriptedStore::with_scans(three_batches()));

        let err = flusher(store.clone())
            .flush_with("app:", &FlushControl::with_cancel(token))
            .await
            .unwrap_err();

        assert_eq!(err.partial(), Some(&FlushResult::default()));
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slow_delete() {
        let store = Arc::new(ScriptedStore {
            delete_delay: Some(Duration::from_secs(10)),
            ..ScriptedStore::with_scans(three_batches())
        });

        let control = FlushControl::default().deadline(Duration::from_secs(1));
        let err = flusher(store.clone())
            .flush_with("app:", &control)
            .await
            .unwrap_err();

        match err {
            FlushError::Cancelled { reason, partial } => {
                assert_eq!(reason, CancelReason::DeadlineExceeded);
                assert_eq!(partial.keys_deleted, 0);
                assert_eq!(partial.batches, 1);
            }
            other => panic!("expected deadline expiry, got {other:?}"),
        }
        assert_eq!(store.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_per_key_failures_are_reported() {
        let refused = StoreError::delete(StoreErrorKind::Server, "READONLY");
        let store = Arc::new(
            ScriptedStore::with_scans(vec![Ok(KeyBatch::last(keys("app:", 0..3)))]).with_deletes(
                vec![Ok(DeleteOutcome {
                    deleted: 2,
                    failures: vec![("app:1".to_string(), refused.clone())],
                })],
            ),
        );

        let result = flusher(store).flush("app:").await.unwrap();

        assert_eq!(result.keys_deleted, 2);
        assert_eq!(result.errors, vec![FlushFailure {
            target: FailureTarget::Key {
                key: "app:1".to_string()
            },
            cause: refused,
        }]);
    }

    #[tokio::test]
    async fn test_empty_batches_skip_delete() {
        let store = Arc::new(ScriptedStore::with_scans(vec![
            Ok(KeyBatch::new(Vec::new(), Cursor::At(10))),
            Ok(KeyBatch::last(keys("app:", 0..1))),
        ]));

        let result = flusher(store.clone()).flush("app:").await.unwrap();

        assert_eq!(result.keys_deleted, 1);
        assert_eq!(result.batches, 2);
        assert_eq!(
            store
                .calls()
                .iter()
                .filter(|c| matches!(c, Call::Delete(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_control_overrides_batch_size_and_escapes_pattern() {
        let store = Arc::new(ScriptedStore::default());
        let control = FlushControl::default().batch_size(25);

        flusher(store.clone())
            .flush_with("jobs[1]:", &control)
            .await
            .unwrap();

        assert_eq!(store.calls(), vec![Call::Scan {
            pattern: "jobs\\[1\\]:*".to_string(),
            cursor: Cursor::Start,
            limit: 25,
        }]);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (tx, mut rx) = broadcast::channel(16);
        let store = Arc::new(ScriptedStore::with_scans(three_batches()));
        let flusher =
            NamespaceFlusher::with_event_broadcaster(store, FlushOptions::default(), tx);

        flusher.flush("app:").await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.namespace(), "app:");
            kinds.push(event.kind());
        }
        assert_eq!(kinds, vec!["started", "batch", "batch", "batch", "completed"]);
    }

    #[tokio::test]
    async fn test_aborted_event_on_scan_failure() {
        let (tx, mut rx) = broadcast::channel(16);
        let store = Arc::new(ScriptedStore::with_scans(vec![Err(StoreError::scan(
            StoreErrorKind::Timeout,
            "timed out",
        ))]));
        let flusher =
            NamespaceFlusher::with_event_broadcaster(store, FlushOptions::default(), tx);

        assert!(flusher.flush("app:").await.is_err());

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.kind())
            .collect();
        assert_eq!(kinds, vec!["started", "aborted"]);
    }
}
