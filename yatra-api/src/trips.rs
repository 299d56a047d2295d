use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use yatra_catalog::Trip;
use yatra_core::TripFilter;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListTripsQuery {
    pub tour_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", get(list_trips))
        .route("/v1/trips/{id}", get(get_trip))
}

/// GET /v1/trips
async fn list_trips(
    State(state): State<AppState>,
    Query(query): Query<ListTripsQuery>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let filter = TripFilter {
        departs_after: query.from,
        departs_before: query.to,
        tour_type: query.tour_type,
        include_inactive: false,
    };
    Ok(Json(state.inventory.list(filter).await?))
}

/// GET /v1/trips/{id}
async fn get_trip(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.inventory.get(id).await?))
}
