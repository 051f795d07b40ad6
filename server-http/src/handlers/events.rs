use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use sweep::FlushEvent;
use tokio_stream::wrappers::BroadcastStream;

#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    namespace: Vec<String>,
    event_type: Vec<String>,
}

impl EventFilter {
    /// Build from decoded query parameters, with CSV support for multiple values
    /// Examples: ?namespace=app:,jobs:&type=batch,completed
    fn from_params(params: &HashMap<String, String>) -> Self {
        let split = |key: &str| -> Vec<String> {
            params
                .get(key)
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            namespace: split("namespace"),
            event_type: split("type"),
        }
    }

    fn accepts(&self, event: &FlushEvent) -> bool {
        if !self.namespace.is_empty() && !self.namespace.iter().any(|n| n == event.namespace()) {
            return false;
        }
        if !self.event_type.is_empty() && !self.event_type.iter().any(|t| t == event.kind()) {
            return false;
        }
        true
    }
}

/// GET /events
///
/// Streams flush progress events to SSE clients
pub async fn stream_events(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let filter = EventFilter::from_params(&params);

    tracing::info!(
        "New SSE client connected. Filters: namespace={:?}, type={:?}",
        filter.namespace,
        filter.event_type
    );

    let rx = state.event_channel.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let filter = filter.clone();
        async move {
            match result {
                Ok(event) if filter.accepts(&event) => Some(Ok(to_sse_event(&event))),
                Ok(_) => None,
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(n)) => {
                    Some(Ok(Event::default()
                        .event("error")
                        .data(format!("Lagged by {} events", n))))
                }
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_sse_event(event: &FlushEvent) -> Event {
    Event::default()
        .event(format!("flush.{}", event.kind()))
        .json_data(event)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;
    use sweep::events::{BatchDeletedEvent, FlushCompletedEvent};

    fn batch(namespace: &str) -> FlushEvent {
        FlushEvent::BatchDeleted(BatchDeletedEvent {
            namespace: namespace.to_string(),
            index: 0,
            scanned: 3,
            deleted: 3,
            failed: 0,
            timestamp: 0,
        })
    }

    fn completed(namespace: &str) -> FlushEvent {
        FlushEvent::Completed(FlushCompletedEvent {
            namespace: namespace.to_string(),
            keys_deleted: 3,
            batches: 1,
            errors: 0,
            timestamp: 0,
        })
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = EventFilter::default();
        assert!(filter.accepts(&batch("app:")));
        assert!(filter.accepts(&completed("jobs:")));
    }

    fn filter_for(uri: &str) -> EventFilter {
        let uri: Uri = uri.parse().unwrap();
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&uri).unwrap();
        EventFilter::from_params(&params)
    }

    #[test]
    fn test_filter_by_namespace_and_type() {
        let filter = filter_for("http://localhost/events?namespace=app:,jobs:&type=completed");
        assert!(filter.accepts(&completed("app:")));
        assert!(filter.accepts(&completed("jobs:")));
        assert!(!filter.accepts(&batch("app:")));
        assert!(!filter.accepts(&completed("other:")));
    }

    #[test]
    fn test_filter_values_are_percent_decoded() {
        let filter = filter_for("http://localhost/events?namespace=app%3A%2Cjobs%3A&type=completed");
        assert!(filter.accepts(&completed("app:")));
        assert!(filter.accepts(&completed("jobs:")));
        assert!(!filter.accepts(&completed("app%3A")));

        let filter = filter_for("http://localhost/events?namespace=user+cache%3A");
        assert!(filter.accepts(&batch("user cache:")));
    }

    #[test]
    fn test_blank_filter_values_are_ignored() {
        let filter = filter_for("http://localhost/events?namespace=&type=completed,");
        assert!(filter.accepts(&completed("anything:")));
        assert!(!filter.accepts(&batch("anything:")));
    }
}
