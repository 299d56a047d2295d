use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Pool, Postgres, Transaction};
use uuid::Uuid;
use yatra_catalog::Trip;
use yatra_core::booking::{Booking, BookingStatus, Passenger, PaymentRecord, PaymentRecordStatus, PaymentStatus};
use yatra_core::repository::{
    BookingFilter, BookingRepository, Cancellation, CancellationReceipt, PaymentFilter, PaymentRepository,
    Reservation, ReservationReceipt, Settlement, StoreError, StoreResult,
};

use crate::database::store_error;
use crate::trip_repo::{TripRow, TRIP_COLUMNS};

const BOOKING_COLUMNS: &str = "id, booking_number, user_id, trip_id, passenger_count, passengers, seat_labels, \
     total_amount, advance_amount, payment_status, booking_status, payment_method, created_at, updated_at";

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, kind, status, method, retry_of, created_at, updated_at";

#[derive(Debug, FromRow)]
struct BookingRow {
    id: Uuid,
    booking_number: String,
    user_id: String,
    trip_id: Uuid,
    passenger_count: i32,
    passengers: Json<Vec<Passenger>>,
    seat_labels: Vec<String>,
    total_amount: i64,
    advance_amount: Option<i64>,
    payment_status: String,
    booking_status: String,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            booking_number: row.booking_number,
            user_id: row.user_id,
            trip_id: row.trip_id,
            passenger_count: row.passenger_count,
            passengers: row.passengers.0,
            seat_labels: row.seat_labels,
            total_amount: row.total_amount,
            advance_amount: row.advance_amount,
            payment_status: row.payment_status.parse().map_err(invalid)?,
            booking_status: row.booking_status.parse().map_err(invalid)?,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: i64,
    kind: String,
    status: String,
    method: String,
    retry_of: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            kind: row.kind.parse().map_err(invalid)?,
            status: row.status.parse().map_err(invalid)?,
            method: row.method,
            retry_of: row.retry_of,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn invalid(err: yatra_core::booking::UnknownVariant) -> StoreError {
    StoreError::Invalid(err.to_string())
}

/// Bookings and the payment ledger. Every commit runs in one transaction
/// whose writes are conditional on the state the engine read.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: Pool<Postgres>,
}

impl PgBookingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn booking_in(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| store_error("get booking", e))?;
        row.map(Booking::try_from).transpose()
    }

    async fn insert_payment(tx: &mut Transaction<'_, Postgres>, record: &PaymentRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO payment_records (id, booking_id, amount, kind, status, method, retry_of, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.booking_id)
        .bind(record.amount)
        .bind(record.kind.as_str())
        .bind(record.status.as_str())
        .bind(&record.method)
        .bind(record.retry_of)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| store_error("insert payment record", e))?;
        Ok(())
    }

    /// Conditional booking status write; `Conflict` when the guard misses.
    async fn transition(
        tx: &mut Transaction<'_, Postgres>,
        booking_id: Uuid,
        expected_payment_status: PaymentStatus,
        booking_status: BookingStatus,
        payment_status: PaymentStatus,
    ) -> StoreResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET booking_status = $2, payment_status = $3, updated_at = NOW() \
             WHERE id = $1 AND booking_status = 'CONFIRMED' AND payment_status = $4 \
             RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(booking_status.as_str())
        .bind(payment_status.as_str())
        .bind(expected_payment_status.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| store_error("update booking status", e))?;

        match row {
            Some(row) => Booking::try_from(row),
            None => match Self::booking_in(tx, booking_id).await? {
                None => Err(StoreError::NotFound(format!("booking {}", booking_id))),
                Some(current) => Err(StoreError::Conflict(format!(
                    "booking {} changed to {}/{}",
                    current.booking_number, current.booking_status, current.payment_status
                ))),
            },
        }
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn commit_reservation(&self, reservation: Reservation) -> StoreResult<ReservationReceipt> {
        let draft = reservation.draft;
        let count = draft.passenger_count();
        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin reservation", e))?;

        let trip_row: Option<TripRow> = sqlx::query_as(&format!(
            "UPDATE trips SET \
                available_seats = available_seats - $2, \
                status = CASE WHEN available_seats - $2 = 0 THEN 'FULL' ELSE 'UPCOMING' END, \
                updated_at = NOW() \
             WHERE id = $1 AND available_seats = $3 AND available_seats >= $2 \
               AND is_active AND status IN ('UPCOMING', 'FULL') \
             RETURNING {}",
            TRIP_COLUMNS
        ))
        .bind(draft.trip_id)
        .bind(count)
        .bind(reservation.expected_available)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("reserve seats", e))?;

        let trip = match trip_row {
            Some(row) => Trip::try_from(row)?,
            None => {
                // Dropping the transaction rolls it back.
                let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM trips WHERE id = $1)")
                    .bind(draft.trip_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| store_error("check trip", e))?;
                return Err(if exists {
                    StoreError::Conflict(format!("trip {} changed since it was read", draft.trip_id))
                } else {
                    StoreError::NotFound(format!("trip {}", draft.trip_id))
                });
            }
        };

        let (sequence,): (i64,) = sqlx::query_as("SELECT nextval('booking_number_seq')")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| store_error("allocate booking number", e))?;

        let booking = draft.into_booking(sequence);

        sqlx::query(
            "INSERT INTO bookings (id, booking_number, user_id, trip_id, passenger_count, passengers, seat_labels, \
             total_amount, advance_amount, payment_status, booking_status, payment_method, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(booking.id)
        .bind(&booking.booking_number)
        .bind(&booking.user_id)
        .bind(booking.trip_id)
        .bind(booking.passenger_count)
        .bind(Json(&booking.passengers))
        .bind(&booking.seat_labels)
        .bind(booking.total_amount)
        .bind(booking.advance_amount)
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_status.as_str())
        .bind(&booking.payment_method)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| store_error("insert booking", e))?;

        if let Some(record) = &reservation.advance_payment {
            Self::insert_payment(&mut tx, record).await?;
        }

        tx.commit().await.map_err(|e| store_error("commit reservation", e))?;

        Ok(ReservationReceipt {
            booking,
            trip,
            advance_payment: reservation.advance_payment,
        })
    }

    async fn commit_cancellation(&self, cancellation: Cancellation) -> StoreResult<CancellationReceipt> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin cancellation", e))?;

        let booking = Self::transition(
            &mut tx,
            cancellation.booking_id,
            cancellation.expected_payment_status,
            BookingStatus::Cancelled,
            cancellation.payment_status,
        )
        .await?;

        let trip_row: Option<TripRow> = sqlx::query_as(&format!(
            "UPDATE trips SET \
                available_seats = available_seats + $2, \
                status = CASE WHEN status = 'FULL' THEN 'UPCOMING' ELSE status END, \
                updated_at = NOW() \
             WHERE id = $1 AND available_seats + $2 <= total_seats \
             RETURNING {}",
            TRIP_COLUMNS
        ))
        .bind(booking.trip_id)
        .bind(booking.passenger_count)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| store_error("release seats", e))?;

        let trip = match trip_row {
            Some(row) => Trip::try_from(row)?,
            None => {
                let current: Option<TripRow> =
                    sqlx::query_as(&format!("SELECT {} FROM trips WHERE id = $1", TRIP_COLUMNS))
                        .bind(booking.trip_id)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| store_error("get trip", e))?;
                return Err(match current {
                    Some(row) => StoreError::SeatsExceedCapacity {
                        resulting: row.available_seats + booking.passenger_count,
                        total: row.total_seats,
                    },
                    None => StoreError::NotFound(format!("trip {}", booking.trip_id)),
                });
            }
        };

        if let Some(refund) = &cancellation.refund {
            Self::insert_payment(&mut tx, refund).await?;
        }

        tx.commit().await.map_err(|e| store_error("commit cancellation", e))?;

        Ok(CancellationReceipt {
            booking,
            trip,
            refund: cancellation.refund,
        })
    }

    async fn commit_settlement(&self, settlement: Settlement) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin settlement", e))?;

        let booking = Self::transition(
            &mut tx,
            settlement.booking_id,
            settlement.expected_payment_status,
            BookingStatus::Confirmed,
            PaymentStatus::FullPaid,
        )
        .await?;

        Self::insert_payment(&mut tx, &settlement.payment).await?;
        tx.commit().await.map_err(|e| store_error("commit settlement", e))?;
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("get booking", e))?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_number(&self, booking_number: &str) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {} FROM bookings WHERE booking_number = $1", BOOKING_COLUMNS))
                .bind(booking_number)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("find booking by number", e))?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings \
             WHERE ($1::uuid IS NULL OR trip_id = $1) \
               AND ($2::text IS NULL OR user_id = $2) \
               AND ($3::text IS NULL OR booking_status = $3) \
             ORDER BY created_at DESC",
            BOOKING_COLUMNS
        ))
        .bind(filter.trip_id)
        .bind(&filter.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list bookings", e))?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}

#[async_trait]
impl PaymentRepository for PgBookingRepository {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| store_error("begin payment", e))?;
        Self::insert_payment(&mut tx, record).await?;
        tx.commit().await.map_err(|e| store_error("commit payment", e))?;
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<PaymentRecord>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {} FROM payment_records WHERE id = $1", PAYMENT_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("get payment record", e))?;
        row.map(PaymentRecord::try_from).transpose()
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<PaymentRecord>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM payment_records \
             WHERE ($1::uuid IS NULL OR booking_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at",
            PAYMENT_COLUMNS
        ))
        .bind(filter.booking_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| store_error("list payment records", e))?;

        rows.into_iter().map(PaymentRecord::try_from).collect()
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentRecordStatus,
        status: PaymentRecordStatus,
    ) -> StoreResult<PaymentRecord> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "UPDATE payment_records SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status = $3 \
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| store_error("update payment record", e))?;

        match row {
            Some(row) => PaymentRecord::try_from(row),
            None => match self.get_payment(id).await? {
                None => Err(StoreError::NotFound(format!("payment record {}", id))),
                Some(current) => Err(StoreError::Conflict(format!(
                    "payment record {} is {} not {}",
                    id, current.status, expected
                ))),
            },
        }
    }
}
