// ============================================================================
// HTTP surface
// ============================================================================
//
// - mod.rs: router assembly and the middleware stack
// - conversations.rs: conversation and message endpoints
// - uploads.rs: upload-page registration and the long-poll endpoint
// - health.rs: liveness and Prometheus exposition
// - extractors.rs: bearer-JWT extractor
//
// ============================================================================

mod conversations;
mod extractors;
mod health;
mod uploads;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Assembles the full route table over the shared context.
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Conversations and messages
        .route(
            "/api/v1/conversation",
            post(conversations::fetch_or_create),
        )
        .route("/api/v1/conversations", get(conversations::list))
        .route(
            "/api/v1/conversations/:id/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route(
            "/api/v1/conversations/:id/read",
            post(conversations::mark_read),
        )
        // Upload pages
        .route("/api/v1/uploads/pages", post(uploads::register_page))
        .route(
            "/api/v1/uploads/:upload_id/pages/:page_number",
            get(uploads::wait_for_page),
        )
        // Middleware order matters: the last layer added runs first.
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(app_context)
}
