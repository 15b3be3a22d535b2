use crate::metrics::EXPOSITION_CONTENT_TYPE;
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// Liveness probe. Returns 200 while the server is running.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Prometheus scrape endpoint, text exposition format version 0.0.4.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.render(),
    )
}
