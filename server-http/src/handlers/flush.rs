use crate::state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use shared_http::api::{ApiResponse, FlushQuery, FlushRequest, FlushResponse};
use sweep::{CancelReason, FlushError, FlushOperations, FlushResult};
use tracing::info;

/// DELETE /namespaces/{namespace}
pub async fn flush_namespace(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
    query: Result<Query<FlushQuery>, QueryRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let Query(query) = match query {
        Ok(query) => query,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(state.responses.error(format!("invalid query: {e}"), None)),
            );
        }
    };
    info!("FLUSH: namespace={}", namespace);

    let control = query.to_control(state.shutdown.child_token());
    let outcome = state.flusher.flush_with(&namespace, &control).await;
    respond(&state, &namespace, outcome)
}

/// POST /flush
///
/// Flushes the configured namespace unless the body names another one.
pub async fn flush_default(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    let request = if body.is_empty() {
        FlushRequest::default()
    } else {
        match serde_json::from_slice::<FlushRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(state.responses.error(format!("invalid request body: {e}"), None)),
                );
            }
        }
    };

    let namespace = request
        .namespace
        .unwrap_or_else(|| state.config.namespace.clone());
    info!("FLUSH: namespace={} (default endpoint)", namespace);

    let control = request.options.to_control(state.shutdown.child_token());
    let outcome = state.flusher.flush_with(&namespace, &control).await;
    respond(&state, &namespace, outcome)
}

fn respond(
    state: &AppState,
    namespace: &str,
    outcome: Result<FlushResult, FlushError>,
) -> (StatusCode, Json<ApiResponse>) {
    match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(
                state
                    .responses
                    .success(FlushResponse::new(namespace, result, false)),
            ),
        ),
        Err(err) => {
            let partial = err
                .partial()
                .cloned()
                .map(|partial| FlushResponse::new(namespace, partial, true));
            (
                status_for(&err),
                Json(state.responses.error(err.to_string(), partial)),
            )
        }
    }
}

fn status_for(err: &FlushError) -> StatusCode {
    match err {
        FlushError::InvalidNamespace(_) => StatusCode::BAD_REQUEST,
        FlushError::Store { .. } => StatusCode::BAD_GATEWAY,
        FlushError::Cancelled {
            reason: CancelReason::Requested,
            ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        FlushError::Cancelled {
            reason: CancelReason::DeadlineExceeded,
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
    }
}
