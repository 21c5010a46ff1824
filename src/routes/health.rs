// ============================================================================
// Liveness and metrics
// ============================================================================

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /health. Pure liveness: answers as long as the process serves
/// requests, without touching the database or broker.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "atelier-chat",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /metrics, Prometheus text exposition.
pub async fn metrics() -> impl IntoResponse {
    match crate::metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Metrics gathering failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain")],
                "Internal Server Error".to_string(),
            )
        }
    }
}
