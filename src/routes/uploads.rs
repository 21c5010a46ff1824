// ============================================================================
// Upload Page Routes
// ============================================================================
//
// Endpoints:
// - POST /api/v1/uploads/pages - Record a processed upload page
// - GET  /api/v1/uploads/:upload_id/pages/:page_number - Long-poll until
//   the page appears or the deadline passes
//
// ============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::AuthenticatedUser;

/// Request body for recording a processed page
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPageRequest {
    pub upload_id: String,
    /// 1-based page number within the upload
    pub page_number: i32,
    pub image_url: String,
}

/// Query parameters for the long-poll endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForPageParams {
    /// How long to wait before giving up; capped at the configured
    /// ceiling
    pub wait_secs: Option<u64>,
}

/// POST /api/v1/uploads/pages
/// Records a processed page; re-registering the same page replaces its URL
pub async fn register_page(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(_actor): AuthenticatedUser,
    Json(payload): Json<RegisterPageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let upload_id = payload.upload_id.trim();
    if upload_id.is_empty() {
        return Err(AppError::validation("uploadId must not be empty"));
    }
    if payload.page_number < 1 {
        return Err(AppError::validation("pageNumber must be positive"));
    }
    let image_url = payload.image_url.trim();
    if image_url.is_empty() {
        return Err(AppError::validation("imageUrl must not be empty"));
    }

    let page = ctx
        .store
        .record_upload_page(upload_id, payload.page_number, image_url)
        .await?;
    Ok((StatusCode::OK, Json(page)))
}

/// GET /api/v1/uploads/:upload_id/pages/:page_number
/// Blocks until the page is registered or the deadline passes;
/// `found: false` is the normal timeout outcome, not an error
pub async fn wait_for_page(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(_actor): AuthenticatedUser,
    Path((upload_id, page_number)): Path<(String, i32)>,
    Query(params): Query<WaitForPageParams>,
) -> Result<impl IntoResponse, AppError> {
    if page_number < 1 {
        return Err(AppError::validation("pageNumber must be positive"));
    }

    let deadline = Duration::from_secs(
        params
            .wait_secs
            .unwrap_or(ctx.config.upload.wait_ceiling_secs),
    );
    let outcome = ctx.waiter.wait_for(&upload_id, page_number, deadline).await?;
    Ok((StatusCode::OK, Json(outcome)))
}
