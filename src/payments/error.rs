use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::payments::gateway::GatewayError;

/// Error types for checkout and reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Transaction not found for checkout request {0}")]
    TransactionNotFound(String),

    /// Checkout requested on an order whose payment is not pending.
    #[error("Invalid order state: {0}")]
    InvalidOrderState(String),

    /// The external gateway failed; the transaction stays pending for
    /// later reconciliation or manual retry.
    #[error("Payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for PaymentError {
    fn from(err: sqlx::Error) -> Self {
        PaymentError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            PaymentError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            PaymentError::OrderNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            PaymentError::TransactionNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            PaymentError::InvalidOrderState(msg) => (StatusCode::CONFLICT, msg.clone()),
            PaymentError::Gateway(err) => {
                tracing::error!("Payment gateway error: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment gateway unavailable, try again later".to_string(),
                )
            }
            PaymentError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
