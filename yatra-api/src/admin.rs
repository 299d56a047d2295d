use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use yatra_booking::{RevenueSummary, TripOccupancy};
use yatra_catalog::{Trip, TripDraft};
use yatra_core::{Booking, ClearSummary};
use yatra_schedule::GenerationSummary;

use crate::error::AppError;
use crate::middleware::{admin_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    pub since: Option<DateTime<Utc>>,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/trips", post(create_trip))
        .route("/v1/admin/trips/{id}", delete(deactivate_trip))
        .route("/v1/admin/trips/{id}/bookings", get(trip_bookings))
        .route("/v1/admin/trips/regenerate", post(regenerate_trips))
        .route("/v1/admin/trips/clear", post(clear_trips))
        .route("/v1/admin/reports/occupancy", get(occupancy_report))
        .route("/v1/admin/reports/occupancy/{trip_id}", get(trip_occupancy))
        .route("/v1/admin/reports/revenue", get(revenue_summary))
        .route_layer(axum::middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Trip Management
// ============================================================================

/// POST /v1/admin/trips
async fn create_trip(
    State(state): State<AppState>,
    Json(draft): Json<TripDraft>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let trip = state.inventory.create(draft).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

/// DELETE /v1/admin/trips/{id}
async fn deactivate_trip(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.inventory.deactivate(id).await?))
}

/// GET /v1/admin/trips/{id}/bookings
async fn trip_bookings(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.engine.list_for_trip(id).await?))
}

/// POST /v1/admin/trips/regenerate
async fn regenerate_trips(State(state): State<AppState>) -> Result<Json<GenerationSummary>, AppError> {
    let summary = state.generator.regenerate(Utc::now()).await?;
    state.metrics.trips_generated.inc_by(summary.trips_created as u64);
    Ok(Json(summary))
}

/// POST /v1/admin/trips/clear
async fn clear_trips(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ClearSummary>, AppError> {
    tracing::warn!("Upcoming trips cleared by {}", claims.sub);
    Ok(Json(state.inventory.clear_upcoming(Utc::now()).await?))
}

// ============================================================================
// Reports
// ============================================================================

/// GET /v1/admin/reports/occupancy
async fn occupancy_report(
    State(state): State<AppState>,
    Query(query): Query<OccupancyQuery>,
) -> Result<Json<Vec<TripOccupancy>>, AppError> {
    let since = query.since.unwrap_or_else(Utc::now);
    Ok(Json(state.reports.occupancy_report(since).await?))
}

/// GET /v1/admin/reports/occupancy/{trip_id}
async fn trip_occupancy(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripOccupancy>, AppError> {
    Ok(Json(state.reports.occupancy(trip_id).await?))
}

/// GET /v1/admin/reports/revenue
async fn revenue_summary(State(state): State<AppState>) -> Result<Json<RevenueSummary>, AppError> {
    Ok(Json(state.reports.revenue_summary().await?))
}
