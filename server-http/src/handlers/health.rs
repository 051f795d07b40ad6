use crate::state::AppState;
use axum::{Json, extract::State};
use shared_http::api::{ApiResponse, HealthResponse};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse> {
    Json(state.responses.success(HealthResponse {
        message: "OK".into(),
    }))
}
