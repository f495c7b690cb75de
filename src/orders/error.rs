use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error types for order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Order not found")]
    NotFound,

    #[error("Menu item not found: {0}")]
    MenuItemNotFound(i32),

    #[error("Menu item {menu_item_id} does not belong to cafeteria {cafeteria_id}")]
    WrongCafeteria { menu_item_id: i32, cafeteria_id: i32 },

    #[error("Menu item {0} is not available")]
    ItemUnavailable(i32),

    #[error("Insufficient stock for menu item {menu_item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        menu_item_id: i32,
        requested: i32,
        available: i32,
    },

    /// Lost the race on a stock decrement inside the placement
    /// transaction; the whole order rolls back.
    #[error("Concurrent update conflict on menu item {0}")]
    ConcurrencyConflict(i32),

    /// Lost the race on a conditional status write; the order moved
    /// between the validation read and the update.
    #[error("Order status changed concurrently")]
    StatusConflict,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid status transition: {0}")]
    InvalidStateTransition(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::DatabaseError(err.to_string())
    }
}

impl From<crate::discounts::DiscountError> for OrderError {
    fn from(err: crate::discounts::DiscountError) -> Self {
        match err {
            crate::discounts::DiscountError::DatabaseError(msg) => OrderError::DatabaseError(msg),
            other => OrderError::ValidationError(other.to_string()),
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            OrderError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            OrderError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            OrderError::MenuItemNotFound(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OrderError::WrongCafeteria { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            OrderError::ItemUnavailable(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            OrderError::InsufficientStock { .. } => (StatusCode::CONFLICT, self.to_string()),
            OrderError::ConcurrencyConflict(_) => (StatusCode::CONFLICT, self.to_string()),
            OrderError::StatusConflict => (StatusCode::CONFLICT, self.to_string()),
            OrderError::InvalidQuantity(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            OrderError::InvalidStateTransition(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            OrderError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
