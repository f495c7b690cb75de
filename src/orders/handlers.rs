// HTTP handlers for order endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::orders::{
    CreateOrderRequest, OrderError, OrderResponse, OrderStatus, UpdateStatusRequest,
};

/// Query parameters for order history.
#[derive(Debug, Deserialize)]
pub struct OrderHistoryQuery {
    pub user_id: i32,
    pub status: Option<OrderStatus>,
}

/// Handler for POST /api/orders
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let response = state.order_service.create_order(request).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /api/orders?user_id=&status=
pub async fn get_order_history_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .get_user_orders(query.user_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
pub async fn get_order_by_id_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state.order_service.get_order_by_id(order_id).await?;

    Ok(Json(order))
}

/// Handler for PATCH /api/orders/{order_id}/status
/// Cafeteria staff move orders along the preparation pipeline.
pub async fn update_order_status_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    state
        .order_service
        .update_order_status(order_id, request.status)
        .await?;

    let order = state.order_service.get_order_by_id(order_id).await?;
    Ok(Json(order))
}
