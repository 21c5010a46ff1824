use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Every failure a request can surface.
///
/// Each variant knows its HTTP status, its stable `error_code`, and a
/// user-facing message. Backend errors (`sqlx`, `redis`, `jsonwebtoken`)
/// convert in via `#[from]` so handlers can stay on `?`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid identifier: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("token verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),

    #[error("redis failure: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("broker failure: {0}")]
    Broker(String),

    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn auth(msg: impl Into<String>) -> Self {
        AppError::Auth(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// The user-facing body stays a plain "Access denied"; the detail in
    /// `msg` only reaches the logs.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn broker(msg: impl Into<String>) -> Self {
        AppError::Broker(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Uuid(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Redis(_)
            | AppError::Broker(_)
            | AppError::Json(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, part of the wire contract.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::Uuid(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Redis(_) | AppError::Broker(_) => "BROKER_ERROR",
            AppError::Json(_) => "JSON_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// What the client is allowed to see. Internal detail stays out of
    /// every 5xx message, and `Forbidden` stays opaque so probing cannot
    /// reveal whether a conversation exists.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("Validation error: {}", msg),
            AppError::Uuid(_) => "Validation error: malformed identifier".to_string(),
            AppError::Auth(msg) => format!("Authentication failed: {}", msg),
            AppError::Jwt(_) => "Invalid or expired token".to_string(),
            AppError::Forbidden(_) => "Access denied".to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
            AppError::Database(_) => "Database error".to_string(),
            AppError::Redis(_) | AppError::Broker(_) => "Notification broker error".to_string(),
            AppError::Json(_) | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Severity follows the class: 5xx is an incident, auth rejections
    /// are worth a warning, the rest is client noise.
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Request failed"
            );
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(
                error = %self,
                error_code = %code,
                "Request rejected"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Request invalid"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = json!({
            "error": self.user_message(),
            "error_code": self.error_code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_error_taxonomy() {
        assert_eq!(
            AppError::validation("empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::auth("missing header").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::forbidden("not a participant").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::not_found("conversation").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::broker("publish failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn forbidden_body_never_names_the_resource() {
        let err = AppError::forbidden("conversation 42 belongs to another user");
        assert_eq!(err.user_message(), "Access denied");
    }

    #[test]
    fn backend_detail_never_reaches_the_user_message() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.user_message(), "Database error");
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
