use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::observability::get_metrics;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Invoice Extractor API" }))
}

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "invoice-extractor",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the upload archive directory exists.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::fs::metadata(state.archive.base_path()).await {
        Ok(meta) if meta.is_dir() => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
