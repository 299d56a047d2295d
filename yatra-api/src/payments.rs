use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use yatra_core::{PaymentRecord, PaymentRecordStatus};

use crate::error::AppError;
use crate::middleware::{admin_auth_middleware, customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub status: PaymentRecordStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/v1/payments/{id}/retry", post(retry_payment))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), customer_auth_middleware));

    // Gateway callbacks arrive with an operator token
    let operator = Router::new()
        .route("/v1/payments/{id}/outcome", post(record_outcome))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware));

    customer.merge(operator)
}

/// POST /v1/payments/{id}/retry
async fn retry_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<PaymentRecord>), AppError> {
    let record = state.ledger.get(id).await?;
    let booking = state.engine.get_booking(record.booking_id).await?;
    if !claims.can_access(&booking.user_id) {
        return Err(AppError::NotFoundError(format!("Payment record not found: {}", id)));
    }

    let retried = state.ledger.retry(id).await?;
    Ok((StatusCode::CREATED, Json(retried)))
}

/// POST /v1/payments/{id}/outcome
async fn record_outcome(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OutcomeRequest>,
) -> Result<Json<PaymentRecord>, AppError> {
    Ok(Json(state.ledger.record_outcome(id, req.status).await?))
}
