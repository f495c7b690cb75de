// Centralized error type for the catalogue (menu/cafeteria) endpoints.
// Domain modules (orders, discounts, payments, pricing) carry their own
// error enums with the same response shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Error type returned by the catalogue handlers.
/// Each variant maps to one HTTP status code.
#[derive(Debug)]
pub enum ApiError {
    /// Request validation failures. HTTP 400.
    ValidationError(validator::ValidationErrors),

    /// Malformed listing query (bad price range, sort field...). HTTP 400.
    InvalidQuery(String),

    /// Resource lookup by id failed. HTTP 404.
    NotFound { resource: String, id: String },

    /// Duplicate resource (e.g. menu item name within a cafeteria). HTTP 409.
    Conflict { message: String },

    /// Database operation failure. HTTP 500; details stay server-side.
    DatabaseError(sqlx::Error),

    /// Anything else that should not leak details to the client. HTTP 500.
    InternalError(String),
}

/// Wire format shared by every error response in the API.
#[derive(Serialize)]
pub struct ErrorResponse {
    /// Machine-readable code, e.g. "NOT_FOUND".
    pub error_code: String,
    /// Human-readable message safe to show to the user.
    pub message: String,
    /// Optional field-level detail (validation errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// ISO 8601 timestamp of the failure.
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let mut body = ErrorResponse::new("VALIDATION_ERROR", "Request validation failed");
                body.details = serde_json::to_value(errors).ok();
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::InvalidQuery(message) => {
                debug!("Invalid query: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("INVALID_QUERY", message.clone()),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::Conflict { message } => {
                warn!("Conflict: {}", message);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("CONFLICT", message.clone()),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred"),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred"),
                )
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}
