use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Pool, Postgres};
use uuid::Uuid;
use yatra_catalog::{Trip, TripDetails, TripStatus};
use yatra_core::repository::{ClearSummary, StoreError, StoreResult, TripFilter, TripRepository, UpsertOutcome};

use crate::database::store_error;

pub(crate) const TRIP_COLUMNS: &str = "id, route_id, destination_id, title, description, departure_at, return_at, \
     departure_clock, return_clock, total_seats, available_seats, price_per_seat, advance_price, status, \
     details, is_active, tour_type, weekend_date, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct TripRow {
    id: Uuid,
    route_id: String,
    destination_id: String,
    title: String,
    description: Option<String>,
    departure_at: DateTime<Utc>,
    return_at: DateTime<Utc>,
    departure_clock: String,
    return_clock: String,
    pub(crate) total_seats: i32,
    pub(crate) available_seats: i32,
    price_per_seat: i64,
    advance_price: Option<i64>,
    status: String,
    details: Json<TripDetails>,
    is_active: bool,
    tour_type: Option<String>,
    weekend_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = StoreError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let status: TripStatus = row.status.parse()?;
        Ok(Trip {
            id: row.id,
            route_id: row.route_id,
            destination_id: row.destination_id,
            title: row.title,
            description: row.description,
            departure_at: row.departure_at,
            return_at: row.return_at,
            departure_clock: row.departure_clock,
            return_clock: row.return_clock,
            total_seats: row.total_seats,
            available_seats: row.available_seats,
            price_per_seat: row.price_per_seat,
            advance_price: row.advance_price,
            status,
            details: row.details.0,
            is_active: row.is_active,
            tour_type: row.tour_type,
            weekend_date: row.weekend_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Trip inventory in Postgres. Seat changes are single conditional UPDATEs so
/// the database arbitrates concurrent writers.
#[derive(Clone)]
pub struct PgTripRepository {
    pool: Pool<Postgres>,
}

impl PgTripRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let row: Option<TripRow> = sqlx::query_as(&format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_error("get trip", e))?;
        row.map(Trip::try_from).transpose()
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO trips (id, route_id, destination_id, title, description, departure_at, return_at, \
             departure_clock, return_clock, total_seats, available_seats, price_per_seat, advance_price, status, \
             details, is_active, tour_type, weekend_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)",
        )
        .bind(trip.id)
        .bind(&trip.route_id)
        .bind(&trip.destination_id)
        .bind(&trip.title)
        .bind(&trip.description)
        .bind(trip.departure_at)
        .bind(trip.return_at)
        .bind(&trip.departure_clock)
        .bind(&trip.return_clock)
        .bind(trip.total_seats)
        .bind(trip.available_seats)
        .bind(trip.price_per_seat)
        .bind(trip.advance_price)
        .bind(trip.status.as_str())
        .bind(Json(&trip.details))
        .bind(trip.is_active)
        .bind(&trip.tour_type)
        .bind(trip.weekend_date)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| store_error("insert trip", e))?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        self.fetch(id).await
    }

    async fn list_trips(&self, filter: &TripFilter) -> StoreResult<Vec<Trip>> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trips \
             WHERE ($1 OR is_active) \
               AND ($2::timestamptz IS NULL OR departure_at >= $2) \
               AND ($3::timestamptz IS NULL OR departure_at < $3) \
               AND ($4::text IS NULL OR tour_type = $4) \
             ORDER BY departure_at",
            TRIP_COLUMNS
        ))
        .bind(filter.include_inactive)
        .bind(filter.departs_after)
        .bind(filter.departs_before)
        .bind(&filter.tour_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list trips", e))?;

        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn adjust_seats(
        &self,
        id: Uuid,
        delta: i32,
        expected_available: Option<i32>,
    ) -> StoreResult<Trip> {
        let row: Option<TripRow> = sqlx::query_as(&format!(
            "UPDATE trips SET \
                available_seats = available_seats + $2, \
                status = CASE \
                    WHEN status = 'UPCOMING' AND available_seats + $2 = 0 THEN 'FULL' \
                    WHEN status = 'FULL' AND available_seats + $2 > 0 THEN 'UPCOMING' \
                    ELSE status END, \
                updated_at = NOW() \
             WHERE id = $1 \
               AND ($3::int IS NULL OR available_seats = $3) \
               AND available_seats + $2 BETWEEN 0 AND total_seats \
             RETURNING {}",
            TRIP_COLUMNS
        ))
        .bind(id)
        .bind(delta)
        .bind(expected_available)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("adjust seats", e))?;

        if let Some(row) = row {
            return Trip::try_from(row);
        }

        // Nothing matched; work out which guard refused the write.
        let current = self
            .fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", id)))?;
        if let Some(expected) = expected_available {
            if current.available_seats != expected {
                return Err(StoreError::Conflict(format!(
                    "trip {} seats moved from {} to {}",
                    id, expected, current.available_seats
                )));
            }
        }
        current.seats_after(delta)?;
        Err(StoreError::Conflict(format!("trip {} changed during seat adjustment", id)))
    }

    async fn upsert_generated(&self, trip: &Trip) -> StoreResult<UpsertOutcome> {
        let (Some(weekend_date), Some(tour_type)) = (trip.weekend_date, trip.tour_type.as_deref()) else {
            return Err(StoreError::Invalid("generated trip needs weekend_date and tour_type".to_string()));
        };

        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin upsert", e))?;

        let existing: Option<TripRow> = sqlx::query_as(&format!(
            "SELECT {} FROM trips WHERE weekend_date = $1 AND tour_type = $2 FOR UPDATE",
            TRIP_COLUMNS
        ))
        .bind(weekend_date)
        .bind(tour_type)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("find generated trip", e))?;

        let outcome = match existing.map(Trip::try_from).transpose()? {
            None => {
                let inserted: Option<TripRow> = sqlx::query_as(&format!(
                    "INSERT INTO trips (id, route_id, destination_id, title, description, departure_at, return_at, \
                     departure_clock, return_clock, total_seats, available_seats, price_per_seat, advance_price, \
                     status, details, is_active, tour_type, weekend_date, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10, $11, $12, 'UPCOMING', $13, TRUE, $14, $15, NOW(), NOW()) \
                     ON CONFLICT (weekend_date, tour_type) DO NOTHING \
                     RETURNING {}",
                    TRIP_COLUMNS
                ))
                .bind(trip.id)
                .bind(&trip.route_id)
                .bind(&trip.destination_id)
                .bind(&trip.title)
                .bind(&trip.description)
                .bind(trip.departure_at)
                .bind(trip.return_at)
                .bind(&trip.departure_clock)
                .bind(&trip.return_clock)
                .bind(trip.total_seats)
                .bind(trip.price_per_seat)
                .bind(trip.advance_price)
                .bind(Json(&trip.details))
                .bind(tour_type)
                .bind(weekend_date)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| store_error("insert generated trip", e))?;

                match inserted {
                    Some(row) => UpsertOutcome::Created(Trip::try_from(row)?),
                    // Lost the insert race to a parallel generator run.
                    None => return Err(StoreError::Conflict(format!("trip for {} {}", weekend_date, tour_type))),
                }
            }
            Some(current) if current.has_bookings() || !current.is_active => UpsertOutcome::Retained(current),
            Some(current) => {
                let row: TripRow = sqlx::query_as(&format!(
                    "UPDATE trips SET title = $2, description = $3, departure_at = $4, return_at = $5, \
                     departure_clock = $6, return_clock = $7, total_seats = $8, available_seats = $8, \
                     price_per_seat = $9, advance_price = $10, details = $11, status = 'UPCOMING', updated_at = NOW() \
                     WHERE id = $1 AND available_seats = total_seats \
                     RETURNING {}",
                    TRIP_COLUMNS
                ))
                .bind(current.id)
                .bind(&trip.title)
                .bind(&trip.description)
                .bind(trip.departure_at)
                .bind(trip.return_at)
                .bind(&trip.departure_clock)
                .bind(&trip.return_clock)
                .bind(trip.total_seats)
                .bind(trip.price_per_seat)
                .bind(trip.advance_price)
                .bind(Json(&trip.details))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| store_error("refresh generated trip", e))?;
                UpsertOutcome::Refreshed(Trip::try_from(row)?)
            }
        };

        tx.commit().await.map_err(|e| store_error("commit upsert", e))?;
        Ok(outcome)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Trip> {
        let row: Option<TripRow> = sqlx::query_as(&format!(
            "UPDATE trips SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TRIP_COLUMNS
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("set trip active", e))?;

        row.map(Trip::try_from)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", id)))
    }

    async fn clear_upcoming(&self, now: DateTime<Utc>) -> StoreResult<ClearSummary> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin clear", e))?;

        let (retained,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trips t WHERE t.departure_at > $1 AND EXISTS ( \
                SELECT 1 FROM bookings b WHERE b.trip_id = t.id \
                AND b.booking_status IN ('CONFIRMED', 'COMPLETED'))",
        )
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| store_error("count booked trips", e))?;

        let deactivated = sqlx::query(
            "UPDATE trips t SET is_active = FALSE, updated_at = NOW() \
             WHERE t.departure_at > $1 AND t.is_active \
               AND EXISTS (SELECT 1 FROM bookings b WHERE b.trip_id = t.id) \
               AND NOT EXISTS (SELECT 1 FROM bookings b WHERE b.trip_id = t.id \
                   AND b.booking_status IN ('CONFIRMED', 'COMPLETED'))",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("deactivate trips", e))?
        .rows_affected();

        let removed = sqlx::query(
            "DELETE FROM trips t WHERE t.departure_at > $1 \
               AND NOT EXISTS (SELECT 1 FROM bookings b WHERE b.trip_id = t.id)",
        )
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("delete trips", e))?
        .rows_affected();

        tx.commit().await.map_err(|e| store_error("commit clear", e))?;

        Ok(ClearSummary {
            removed: removed as usize,
            deactivated: deactivated as usize,
            retained_with_bookings: retained as usize,
        })
    }
}
