// ============================================================================
// Request extractors
// ============================================================================
//
// AuthenticatedUser pulls the bearer JWT out of the Authorization header,
// verifies it, and yields the acting party. Handlers declare it as an
// argument and never see unauthenticated requests.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::error::AppError;
use crate::service::Actor;

/// The verified caller of a request.
///
/// ```rust,ignore
/// async fn handler(AuthenticatedUser(actor): AuthenticatedUser) {
///     // actor.id, actor.role
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        // AppError's IntoResponse logs the rejection and renders the
        // standard error body, same as any handler failure.
        let actor = extract_actor(state, parts).map_err(IntoResponse::into_response)?;
        Ok(AuthenticatedUser(actor))
    }
}

/// Verifies the bearer token and maps its claims onto an Actor. The
/// role claim is a closed enum, so a token carrying any other role
/// value already failed verification.
fn extract_actor(ctx: &AppContext, parts: &Parts) -> Result<Actor, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::auth("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth("Authorization header must use the Bearer scheme"))?;

    let claims = ctx
        .auth_manager
        .verify_token(token)
        .map_err(|e| AppError::auth(format!("Invalid or expired token: {}", e)))?;

    let id = Uuid::parse_str(&claims.sub)?;

    Ok(Actor {
        id,
        email: claims.email,
        role: claims.role,
    })
}
