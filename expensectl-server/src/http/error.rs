//! API error types with IntoResponse
//!
//! Errors are converted to JSON responses with appropriate status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use expensectl_core::reports::ReportError;
use serde_json::json;

use crate::db::repos::DbError;
use crate::models::ValidationError;
use crate::reports::ReportRunError;
use crate::sync::SyncError;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Validation failed (400)
    Validation(ValidationError),

    /// Malformed or inconsistent request (400)
    BadRequest { message: String },

    /// Missing or unknown API key (401)
    Unauthorized,

    /// Resource not found or owned by someone else (404)
    NotFound { resource: &'static str, id: String },

    /// Wrong HTTP method (405)
    MethodNotAllowed,

    /// Request conflicts with stored data (409)
    Conflict { reason: String },

    /// Database error (500, logged)
    Database(DbError),

    /// Internal error (500)
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Validation(e) => json!({
                "error": "validation_error",
                "message": e.to_string()
            }),
            Self::BadRequest { message } => json!({
                "error": "bad_request",
                "message": message
            }),
            Self::Unauthorized => json!({
                "error": "unauthorized",
                "message": "a valid API key is required"
            }),
            Self::NotFound { resource, id } => json!({
                "error": "not_found",
                "message": format!("{} '{}' not found", resource, id)
            }),
            Self::MethodNotAllowed => json!({
                "error": "method_not_allowed",
                "message": "method not allowed"
            }),
            Self::Conflict { reason } => json!({
                "error": "conflict",
                "message": reason
            }),
            Self::Database(e) => {
                // Log the actual error, return generic message
                tracing::error!("Database error: {}", e);
                json!({
                    "error": "internal_error",
                    "message": "an internal error occurred"
                })
            }
            Self::Internal { message } => {
                tracing::error!("Internal error: {}", message);
                json!({
                    "error": "internal_error",
                    "message": "an internal error occurred"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound { resource, id } => Self::NotFound { resource, id },
            DbError::Conflict { reason } => Self::Conflict { reason },
            DbError::Invalid { reason } => Self::BadRequest { message: reason },
            DbError::Validation(e) => Self::Validation(e),
            DbError::Template(e) => Self::bad_request(e.to_string()),
            DbError::Sqlx(_) => Self::Database(e),
        }
    }
}

impl From<ReportRunError> for ApiError {
    fn from(e: ReportRunError) -> Self {
        match e {
            ReportRunError::Sqlx(e) => Self::Database(DbError::Sqlx(e)),
            ReportRunError::Report(e @ (ReportError::MissingField(_) | ReportError::UnknownChoice { .. })) => {
                Self::bad_request(e.to_string())
            }
            ReportRunError::Report(e) => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Db(e) => e.into(),
            e @ SyncError::Malformed { .. } => Self::bad_request(e.to_string()),
        }
    }
}
