use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::Serialize;
use yatra_catalog::{InventoryError, Trip};

use crate::booking::{Booking, BookingDraft, BookingStatus, PaymentRecord, PaymentRecordStatus, PaymentStatus};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The row changed between read and conditional write. Safe to retry.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats {
        requested: i32,
        available: i32,
    },

    #[error("Seat count {resulting} would exceed capacity {total}")]
    SeatsExceedCapacity {
        resulting: i32,
        total: i32,
    },

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<InventoryError> for StoreError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(id) | InventoryError::Inactive(id) => StoreError::NotFound(id),
            InventoryError::InsufficientSeats { requested, available } => {
                StoreError::InsufficientSeats { requested, available }
            }
            InventoryError::SeatsExceedCapacity { resulting, total } => {
                StoreError::SeatsExceedCapacity { resulting, total }
            }
            InventoryError::InvalidTrip(msg) => StoreError::Invalid(msg),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    pub departs_after: Option<DateTime<Utc>>,
    pub departs_before: Option<DateTime<Utc>>,
    pub tour_type: Option<String>,
    pub include_inactive: bool,
}

impl TripFilter {
    pub fn matches(&self, trip: &Trip) -> bool {
        if !self.include_inactive && !trip.is_active {
            return false;
        }
        if let Some(after) = self.departs_after {
            if trip.departure_at < after {
                return false;
            }
        }
        if let Some(before) = self.departs_before {
            if trip.departure_at >= before {
                return false;
            }
        }
        if let Some(tour_type) = &self.tour_type {
            if trip.tour_type.as_deref() != Some(tour_type.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Result of writing a generated trip against its `(weekend_date, tour_type)` key
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No trip existed for the key
    Created(Trip),
    /// Existing unsold trip took the new price and schedule
    Refreshed(Trip),
    /// Existing trip has sold seats or was switched off; left untouched
    Retained(Trip),
}

impl UpsertOutcome {
    pub fn trip(&self) -> &Trip {
        match self {
            UpsertOutcome::Created(t) | UpsertOutcome::Refreshed(t) | UpsertOutcome::Retained(t) => t,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearSummary {
    /// Deleted outright, no booking ever referenced them
    pub removed: usize,
    /// Only cancelled bookings referenced them, so they were switched off instead
    pub deactivated: usize,
    /// Still holding seats for live bookings
    pub retained_with_bookings: usize,
}

/// Durable trip inventory
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()>;

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>>;

    async fn list_trips(&self, filter: &TripFilter) -> StoreResult<Vec<Trip>>;

    /// Atomic seat change. With `expected_available` the write only lands if
    /// the counter still holds that value, otherwise `Conflict`.
    async fn adjust_seats(
        &self,
        id: Uuid,
        delta: i32,
        expected_available: Option<i32>,
    ) -> StoreResult<Trip>;

    async fn upsert_generated(&self, trip: &Trip) -> StoreResult<UpsertOutcome>;

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Trip>;

    /// Drop future trips that hold no seats for confirmed or completed bookings.
    async fn clear_upcoming(&self, now: DateTime<Utc>) -> StoreResult<ClearSummary>;
}

/// Seat decrement + booking insert, applied together or not at all
#[derive(Debug, Clone)]
pub struct Reservation {
    pub draft: BookingDraft,
    pub expected_available: i32,
    pub advance_payment: Option<PaymentRecord>,
}

#[derive(Debug, Clone)]
pub struct ReservationReceipt {
    pub booking: Booking,
    pub trip: Trip,
    pub advance_payment: Option<PaymentRecord>,
}

/// Status change + seat release (+ refund intent), applied together
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub booking_id: Uuid,
    pub expected_payment_status: PaymentStatus,
    pub payment_status: PaymentStatus,
    pub refund: Option<PaymentRecord>,
}

#[derive(Debug, Clone)]
pub struct CancellationReceipt {
    pub booking: Booking,
    pub trip: Trip,
    pub refund: Option<PaymentRecord>,
}

/// Marks a confirmed booking fully paid and records the balance
#[derive(Debug, Clone)]
pub struct Settlement {
    pub booking_id: Uuid,
    pub expected_payment_status: PaymentStatus,
    pub payment: PaymentRecord,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub trip_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.trip_id.map_or(true, |id| booking.trip_id == id)
            && self.user_id.as_deref().map_or(true, |u| booking.user_id == u)
            && self.status.map_or(true, |s| booking.booking_status == s)
    }
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fails with `Conflict` if the trip's seat counter moved away from
    /// `expected_available` or the trip stopped taking bookings.
    async fn commit_reservation(&self, reservation: Reservation) -> StoreResult<ReservationReceipt>;

    /// Fails with `Conflict` unless the booking is still CONFIRMED with the
    /// expected payment status.
    async fn commit_cancellation(&self, cancellation: Cancellation) -> StoreResult<CancellationReceipt>;

    async fn commit_settlement(&self, settlement: Settlement) -> StoreResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_by_number(&self, booking_number: &str) -> StoreResult<Option<Booking>>;

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;
}

#[derive(Debug, Clone, Default)]
pub struct PaymentFilter {
    pub booking_id: Option<Uuid>,
    pub status: Option<PaymentRecordStatus>,
}

impl PaymentFilter {
    pub fn matches(&self, record: &PaymentRecord) -> bool {
        self.booking_id.map_or(true, |id| record.booking_id == id)
            && self.status.map_or(true, |s| record.status == s)
    }
}

/// Append-only payment ledger storage
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()>;

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<PaymentRecord>>;

    async fn list_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<PaymentRecord>>;

    /// Conditional on the record still being in `expected`.
    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentRecordStatus,
        status: PaymentRecordStatus,
    ) -> StoreResult<PaymentRecord>;
}
