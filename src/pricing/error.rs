use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Menu item with id {0} not found")]
    MenuItemNotFound(i32),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl IntoResponse for PricingError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PricingError::DatabaseError(e) => {
                tracing::error!("Database error in pricing: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            PricingError::MenuItemNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            PricingError::ValidationError(_) => (StatusCode::BAD_REQUEST, self.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
