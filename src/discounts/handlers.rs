// HTTP handlers for discount administration.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::discounts::error::DiscountError;
use crate::discounts::models::{CreateDiscountRequest, Discount};
use crate::discounts::repository::validate_discount_request;

/// Query parameters for listing discounts.
#[derive(Debug, Deserialize)]
pub struct DiscountListQuery {
    pub cafeteria_id: i32,
}

/// Handler for POST /api/discounts
pub async fn create_discount_handler(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<Discount>), DiscountError> {
    request
        .validate()
        .map_err(|e| DiscountError::ValidationError(e.to_string()))?;
    validate_discount_request(&request)?;

    let discount = state.discounts_repo.create(&request).await?;

    tracing::info!(
        "Created {} discount '{}' for cafeteria {}",
        discount.scope,
        discount.name,
        discount.cafeteria_id
    );
    Ok((StatusCode::CREATED, Json(discount)))
}

/// Handler for GET /api/discounts?cafeteria_id=
pub async fn list_discounts_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<DiscountListQuery>,
) -> Result<Json<Vec<Discount>>, DiscountError> {
    let discounts = state
        .discounts_repo
        .find_by_cafeteria(query.cafeteria_id)
        .await?;

    Ok(Json(discounts))
}

/// Handler for PATCH /api/discounts/{id}/deactivate
pub async fn deactivate_discount_handler(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Discount>, DiscountError> {
    let discount = state.discounts_repo.deactivate(id).await?;

    tracing::info!("Deactivated discount {}", id);
    Ok(Json(discount))
}
