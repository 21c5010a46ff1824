// ============================================================================
// Conversation Routes
// ============================================================================
//
// Endpoints:
// - POST /api/v1/conversation - Fetch or create the caller's conversation
// - GET  /api/v1/conversations - Operator inbox listing
// - GET  /api/v1/conversations/:id/messages - Cursor-paginated history
// - POST /api/v1/conversations/:id/messages - Send a message
// - POST /api/v1/conversations/:id/read - Clear the caller's unread flag
//
// ============================================================================

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::AuthenticatedUser;

/// Query parameters for the message history endpoint
#[derive(Debug, Deserialize)]
pub struct GetMessagesParams {
    /// Id of the last message the client already has; the page starts
    /// strictly after it
    pub cursor: Option<Uuid>,
    /// Page size; clamped to the configured maximum
    pub limit: Option<u32>,
}

/// Request body for sending a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// POST /api/v1/conversation
/// Returns the calling user's conversation, creating it on first touch
pub async fn fetch_or_create(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let conversation = ctx.chat.fetch_or_create(&actor).await?;
    Ok((StatusCode::OK, Json(conversation)))
}

/// GET /api/v1/conversations
/// Operator inbox: all conversations, most recent activity first
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let conversations = ctx.chat.list_inbox(&actor).await?;
    Ok((StatusCode::OK, Json(json!({ "conversations": conversations }))))
}

/// GET /api/v1/conversations/:id/messages
/// Ascending page of messages; the response omits `nextCursor` once
/// the end of history is reached
pub async fn get_messages(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<GetMessagesParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = ctx
        .chat
        .history(&actor, conversation_id, params.cursor, params.limit)
        .await?;
    Ok((StatusCode::OK, Json(page)))
}

/// POST /api/v1/conversations/:id/messages
/// Persists and pushes a message from the caller
pub async fn send_message(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = ctx.chat.send(&actor, conversation_id, &payload.text).await?;
    Ok((StatusCode::OK, Json(message)))
}

/// POST /api/v1/conversations/:id/read
/// Clears the caller's own unread flag
pub async fn mark_read(
    State(ctx): State<Arc<AppContext>>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(conversation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    ctx.chat.mark_read(&actor, conversation_id).await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}
