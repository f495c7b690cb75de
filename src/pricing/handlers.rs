use axum::extract::{Path, State};
use axum::response::Json;
use validator::Validate;

use crate::pricing::error::PricingError;
use crate::pricing::models::{
    BulkAdjustmentResult, BulkPriceAdjustmentRequest, PriceHistory, UpdatePriceRequest,
};
use crate::AppState;

/// PATCH /api/menu-items/{id}/price
pub async fn update_price_handler(
    State(state): State<AppState>,
    Path(menu_item_id): Path<i32>,
    Json(request): Json<UpdatePriceRequest>,
) -> Result<Json<crate::models::MenuItem>, PricingError> {
    request
        .validate()
        .map_err(|e| PricingError::ValidationError(e.to_string()))?;

    let item = state
        .pricing_service
        .update_price(menu_item_id, request)
        .await?;
    Ok(Json(item))
}

/// POST /api/cafeterias/{id}/price-adjustments
pub async fn bulk_adjust_handler(
    State(state): State<AppState>,
    Path(cafeteria_id): Path<i32>,
    Json(request): Json<BulkPriceAdjustmentRequest>,
) -> Result<Json<BulkAdjustmentResult>, PricingError> {
    request
        .validate()
        .map_err(|e| PricingError::ValidationError(e.to_string()))?;

    let result = state
        .pricing_service
        .bulk_adjust(cafeteria_id, request)
        .await?;
    Ok(Json(result))
}

/// GET /api/menu-items/{id}/price-history
pub async fn price_history_handler(
    State(state): State<AppState>,
    Path(menu_item_id): Path<i32>,
) -> Result<Json<Vec<PriceHistory>>, PricingError> {
    let history = state.pricing_service.price_history(menu_item_id).await?;
    Ok(Json(history))
}
