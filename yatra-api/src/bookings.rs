use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use yatra_booking::CreateBooking;
use yatra_core::{Booking, Passenger, PaymentRecord};

use crate::error::AppError;
use crate::middleware::{admin_auth_middleware, customer_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub passengers: Vec<Passenger>,
    pub advance_amount: Option<i64>,
    pub payment_method: Option<String>,
    pub seat_labels: Option<Vec<String>>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let customer = Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/me", get(my_bookings))
        .route("/v1/bookings/number/{booking_number}", get(get_by_number))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/payments", get(payment_history))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), customer_auth_middleware));

    // Settlement records money as collected, so only operators may confirm it
    let operator = Router::new()
        .route("/v1/bookings/{id}/confirm-payment", post(confirm_payment))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware));

    customer.merge(operator)
}

/// Owned booking, or 404 so ids of other customers stay hidden.
async fn owned_booking(state: &AppState, claims: &Claims, id: Uuid) -> Result<Booking, AppError> {
    let booking = state.engine.get_booking(id).await?;
    if !claims.can_access(&booking.user_id) {
        return Err(AppError::NotFoundError(format!("Booking not found: {}", id)));
    }
    Ok(booking)
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let request = CreateBooking {
        user_id: claims.sub.clone(),
        trip_id: req.trip_id,
        passengers: req.passengers,
        advance_amount: req.advance_amount,
        payment_method: req.payment_method,
        seat_labels: req.seat_labels,
    };

    match state.engine.create_booking(request).await {
        Ok(booking) => {
            state.metrics.bookings_created.inc();
            tracing::info!("Booking {} created by {}", booking.booking_number, claims.sub);
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(e) => {
            state.metrics.reject(e.reason());
            Err(e.into())
        }
    }
}

/// GET /v1/bookings/me
async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.engine.list_for_user(&claims.sub).await?))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(owned_booking(&state, &claims, id).await?))
}

/// GET /v1/bookings/number/{booking_number}
async fn get_by_number(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_number): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.engine.find_by_number(&booking_number).await?;
    if !claims.can_access(&booking.user_id) {
        return Err(AppError::NotFoundError(format!("Booking not found: {}", booking_number)));
    }
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &claims, id).await?;
    let booking = state.engine.cancel_booking(id).await?;
    state.metrics.bookings_cancelled.inc();
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/confirm-payment
async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.engine.confirm_payment(id).await?;
    tracing::info!("Balance for {} confirmed by {}", booking.booking_number, claims.sub);
    Ok(Json(booking))
}

/// GET /v1/bookings/{id}/payments
async fn payment_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    owned_booking(&state, &claims, id).await?;
    Ok(Json(state.ledger.history(id).await?))
}
