// HTTP handlers for checkout and the provider callback.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::payments::error::PaymentError;
use crate::payments::models::{
    CheckoutResponse, InitiateCheckoutRequest, StkCallbackEnvelope, Transaction,
};

/// Handler for POST /api/orders/{order_id}/checkout
pub async fn initiate_checkout_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<InitiateCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), PaymentError> {
    request
        .validate()
        .map_err(|e| PaymentError::ValidationError(e.to_string()))?;

    let response = state
        .payment_service
        .initiate_checkout(order_id, &request.phone_number)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Handler for POST /api/payments/callback
///
/// The provider delivers at-least-once and does not understand our error
/// semantics, so this endpoint always acknowledges with 200; reconciliation
/// failures are logged and left for the next delivery or manual review.
pub async fn mpesa_callback_handler(
    State(state): State<crate::AppState>,
    Json(envelope): Json<StkCallbackEnvelope>,
) -> Json<serde_json::Value> {
    let callback = &envelope.body.stk_callback;

    if let Err(e) = state.payment_service.handle_callback(callback).await {
        tracing::error!(
            "Failed to reconcile callback for checkout request {}: {}",
            callback.checkout_request_id,
            e
        );
    }

    Json(json!({ "ResultCode": 0, "ResultDesc": "Accepted" }))
}

/// Handler for GET /api/orders/{order_id}/transactions
pub async fn get_order_transactions_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Transaction>>, PaymentError> {
    let transactions = state.payment_service.order_transactions(order_id).await?;

    Ok(Json(transactions))
}
