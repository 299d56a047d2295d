use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use yatra_catalog::Trip;
use yatra_core::booking::{
    Booking, BookingDraft, BookingStatus, Passenger, PaymentKind, PaymentRecord, PaymentRecordStatus,
    PaymentStatus,
};
use yatra_core::repository::{
    BookingFilter, BookingRepository, Cancellation, CancellationReceipt, PaymentRepository, Reservation,
    ReservationReceipt, Settlement, TripRepository,
};
use yatra_core::{MaintenanceLock, Notifier, PaymentGateway};
use yatra_shared::events::{
    BookingCancelledEvent, BookingConfirmedEvent, BookingEvent, PaymentRecordedEvent,
};
use yatra_shared::Masked;

use crate::error::BookingError;
use crate::ledger::submit_to_gateway;

pub const UNSPECIFIED_METHOD: &str = "UNSPECIFIED";

/// Retry and timeout settings for engine operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total attempts for one operation, first try included
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound on a single attempt
    pub operation_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 25,
            max_backoff_ms: 500,
            backoff_multiplier: 2.0,
            operation_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    /// Exponential backoff after the given (1-based) failed attempt, capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis((delay_ms as u64).min(self.max_backoff_ms))
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBooking {
    pub user_id: String,
    pub trip_id: Uuid,
    pub passengers: Vec<Passenger>,
    #[serde(default)]
    pub advance_amount: Option<i64>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub seat_labels: Option<Vec<String>>,
}

impl CreateBooking {
    /// Checks that need nothing from the store.
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.passengers.is_empty() {
            return Err(BookingError::InvalidRequest("at least one passenger is required".to_string()));
        }
        if self.passengers.iter().any(|p| p.name.trim().is_empty()) {
            return Err(BookingError::InvalidRequest("passenger name is required".to_string()));
        }
        if let Some(labels) = &self.seat_labels {
            if labels.len() != self.passengers.len() {
                return Err(BookingError::InvalidRequest(format!(
                    "{} seat labels for {} passengers",
                    labels.len(),
                    self.passengers.len()
                )));
            }
        }
        if matches!(self.advance_amount, Some(a) if a < 0) {
            return Err(BookingError::InvalidRequest("advance_amount cannot be negative".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(BookingError::InvalidRequest("user_id is required".to_string()));
        }
        Ok(())
    }
}

/// Lowest `count` labels in `S1..=S{total}` that no live booking holds.
pub fn assign_seat_labels(trip: &Trip, taken: &HashSet<String>, count: i32) -> Vec<String> {
    (1..=trip.total_seats)
        .map(|n| format!("S{}", n))
        .filter(|label| !taken.contains(label))
        .take(count.max(0) as usize)
        .collect()
}

/// Client-chosen labels must be distinct and not already held.
fn check_requested_labels(labels: &[String], taken: &HashSet<String>) -> Result<(), BookingError> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if label.trim().is_empty() {
            return Err(BookingError::InvalidRequest("seat label cannot be empty".to_string()));
        }
        if !seen.insert(label.as_str()) {
            return Err(BookingError::InvalidRequest(format!("seat {} requested twice", label)));
        }
        if taken.contains(label) {
            return Err(BookingError::InvalidRequest(format!("seat {} is already taken", label)));
        }
    }
    Ok(())
}

/// Reservation, cancellation and settlement of bookings.
///
/// Every operation is one store transaction guarded by an optimistic check on
/// the state it read. Lost races are retried with backoff; each attempt runs
/// under a timeout and holds the shared side of the maintenance lock.
pub struct BookingEngine {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    maintenance: Arc<MaintenanceLock>,
    config: EngineConfig,
}

impl BookingEngine {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        maintenance: Arc<MaintenanceLock>,
    ) -> Self {
        Self {
            trips,
            bookings,
            payments,
            gateway,
            notifier,
            maintenance,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reserve seats for a party on one trip.
    pub async fn create_booking(&self, request: CreateBooking) -> Result<Booking, BookingError> {
        request.validate()?;
        let _gate = self.maintenance.shared().await;

        let receipt = self
            .with_retry("create_booking", || self.try_reserve(&request))
            .await
            .map_err(|e| {
                tracing::warn!("Booking rejected for trip {}: {}", request.trip_id, e);
                e
            })?;

        let booking = receipt.booking;
        tracing::info!(
            "Booking {} confirmed: {} seat(s) on trip {}, {} left",
            booking.booking_number,
            booking.passenger_count,
            receipt.trip.id,
            receipt.trip.available_seats
        );

        if let Some(record) = &receipt.advance_payment {
            self.hand_to_gateway(&booking, record).await;
            self.publish(payment_event(record)).await;
        }

        let lead = booking.passengers.first().map(|p| p.name.clone()).unwrap_or_default();
        self.publish(BookingEvent::Confirmed(BookingConfirmedEvent {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            trip_id: booking.trip_id,
            user_id: booking.user_id.clone(),
            passenger_count: booking.passenger_count,
            lead_passenger: Masked::new(lead),
            seat_labels: booking.seat_labels.clone(),
            total_amount: booking.total_amount,
            advance_amount: booking.advance_amount,
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(booking)
    }

    async fn try_reserve(&self, request: &CreateBooking) -> Result<ReservationReceipt, BookingError> {
        let trip = self
            .trips
            .get_trip(request.trip_id)
            .await?
            .ok_or_else(|| BookingError::TripNotFound(request.trip_id.to_string()))?;

        if !trip.is_bookable() {
            return Err(BookingError::TripInactive(trip.id.to_string()));
        }

        let count = request.passengers.len() as i32;
        if count > trip.available_seats {
            return Err(BookingError::InsufficientSeats {
                requested: count,
                available: trip.available_seats,
            });
        }

        let total_amount = trip.price_per_seat * count as i64;
        let advance = request.advance_amount.filter(|a| *a > 0);
        if let Some(advance) = advance {
            if advance > total_amount {
                return Err(BookingError::InvalidRequest(format!(
                    "advance {} exceeds total {}",
                    advance, total_amount
                )));
            }
        }

        let taken = self.labels_held(trip.id).await?;
        let seat_labels = match &request.seat_labels {
            Some(labels) => {
                check_requested_labels(labels, &taken)?;
                labels.clone()
            }
            None => assign_seat_labels(&trip, &taken, count),
        };

        let draft = BookingDraft {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            trip_id: trip.id,
            passengers: request.passengers.clone(),
            seat_labels,
            total_amount,
            advance_amount: advance,
            payment_status: if advance.is_some() {
                PaymentStatus::AdvancePaid
            } else {
                PaymentStatus::Pending
            },
            payment_method: request.payment_method.clone(),
            created_at: Utc::now(),
        };

        let advance_payment = advance.map(|amount| {
            PaymentRecord::new(
                draft.id,
                amount,
                PaymentKind::Advance,
                PaymentRecordStatus::Pending,
                method_of(&request.payment_method),
            )
        });

        let receipt = self
            .bookings
            .commit_reservation(Reservation {
                draft,
                expected_available: trip.available_seats,
                advance_payment,
            })
            .await?;
        Ok(receipt)
    }

    /// Seat labels of the live bookings on a trip. A cancellation or booking
    /// landing after this read moves `available_seats`, so the reservation
    /// guard rejects the stale view and the attempt is retried.
    async fn labels_held(&self, trip_id: Uuid) -> Result<HashSet<String>, BookingError> {
        let filter = BookingFilter { trip_id: Some(trip_id), ..Default::default() };
        Ok(self
            .bookings
            .list_bookings(&filter)
            .await?
            .into_iter()
            .filter(|b| b.holds_seats())
            .flat_map(|b| b.seat_labels)
            .collect())
    }

    /// Cancel a confirmed booking, releasing its seats and refunding any money taken.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let _gate = self.maintenance.shared().await;

        let receipt = self
            .with_retry("cancel_booking", || self.try_cancel(booking_id))
            .await?;

        let booking = receipt.booking;
        tracing::info!(
            "Booking {} cancelled: {} seat(s) back on trip {} ({} available)",
            booking.booking_number,
            booking.passenger_count,
            receipt.trip.id,
            receipt.trip.available_seats
        );

        if let Some(refund) = &receipt.refund {
            self.hand_to_gateway(&booking, refund).await;
            self.publish(payment_event(refund)).await;
        }

        self.publish(BookingEvent::Cancelled(BookingCancelledEvent {
            booking_id: booking.id,
            booking_number: booking.booking_number.clone(),
            trip_id: booking.trip_id,
            user_id: booking.user_id.clone(),
            seats_released: booking.passenger_count,
            refund_amount: receipt.refund.as_ref().map(|r| r.amount),
            timestamp: Utc::now().timestamp(),
        }))
        .await;

        Ok(booking)
    }

    async fn try_cancel(&self, booking_id: Uuid) -> Result<CancellationReceipt, BookingError> {
        let booking = self.load_booking(booking_id).await?;

        match booking.booking_status {
            BookingStatus::Cancelled => return Err(BookingError::AlreadyCancelled(booking.booking_number)),
            BookingStatus::Completed => return Err(BookingError::CannotCancelCompleted(booking.booking_number)),
            BookingStatus::Confirmed => {}
        }

        let (payment_status, refund) = if booking.money_collected() {
            let refund = PaymentRecord::new(
                booking.id,
                booking.total_amount,
                PaymentKind::Refund,
                PaymentRecordStatus::Processing,
                method_of(&booking.payment_method),
            );
            (PaymentStatus::Refunded, Some(refund))
        } else {
            (booking.payment_status, None)
        };

        let receipt = self
            .bookings
            .commit_cancellation(Cancellation {
                booking_id,
                expected_payment_status: booking.payment_status,
                payment_status,
                refund,
            })
            .await?;
        Ok(receipt)
    }

    /// Settle the outstanding balance of a confirmed booking.
    pub async fn confirm_payment(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        let _gate = self.maintenance.shared().await;

        let (booking, record) = self
            .with_retry("confirm_payment", || self.try_settle(booking_id))
            .await?;

        tracing::info!(
            "Booking {} fully paid, balance {} recorded",
            booking.booking_number,
            record.amount
        );
        self.publish(payment_event(&record)).await;

        Ok(booking)
    }

    async fn try_settle(&self, booking_id: Uuid) -> Result<(Booking, PaymentRecord), BookingError> {
        let booking = self.load_booking(booking_id).await?;

        match (booking.booking_status, booking.payment_status) {
            (BookingStatus::Cancelled, _) => return Err(BookingError::AlreadyCancelled(booking.booking_number)),
            (_, PaymentStatus::FullPaid) => return Err(BookingError::AlreadyFullyPaid(booking.booking_number)),
            (BookingStatus::Completed, _) => {
                return Err(BookingError::InvalidRequest(format!(
                    "booking {} is completed",
                    booking.booking_number
                )))
            }
            _ => {}
        }

        let record = PaymentRecord::new(
            booking.id,
            booking.balance_due(),
            PaymentKind::FullPayment,
            PaymentRecordStatus::Completed,
            method_of(&booking.payment_method),
        );

        let settled = self
            .bookings
            .commit_settlement(Settlement {
                booking_id,
                expected_payment_status: booking.payment_status,
                payment: record.clone(),
            })
            .await?;
        Ok((settled, record))
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.load_booking(booking_id).await
    }

    pub async fn find_by_number(&self, booking_number: &str) -> Result<Booking, BookingError> {
        self.bookings
            .find_by_number(booking_number)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(booking_number.to_string()))
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        let filter = BookingFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        Ok(self.bookings.list_bookings(&filter).await?)
    }

    pub async fn list_for_trip(&self, trip_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        let filter = BookingFilter {
            trip_id: Some(trip_id),
            ..Default::default()
        };
        Ok(self.bookings.list_bookings(&filter).await?)
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))
    }

    /// Runs `attempt` until it stops losing races, or attempts run out.
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, BookingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BookingError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            let outcome = match tokio::time::timeout(self.config.operation_timeout(), attempt()).await {
                Ok(result) => result,
                Err(_) => Err(BookingError::Timeout(operation.to_string())),
            };

            match outcome {
                Err(BookingError::ConcurrentUpdateConflict(reason)) if tries < self.config.max_attempts => {
                    let delay = self.config.backoff_for(tries);
                    tracing::debug!(
                        "{} lost a race (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        tries,
                        self.config.max_attempts,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(BookingError::ConcurrentUpdateConflict(reason)) => {
                    tracing::warn!("{} gave up after {} attempts: {}", operation, tries, reason);
                    return Err(BookingError::ConcurrentUpdateConflict(reason));
                }
                other => return other,
            }
        }
    }

    async fn hand_to_gateway(&self, booking: &Booking, record: &PaymentRecord) {
        submit_to_gateway(self.gateway.as_ref(), self.payments.as_ref(), booking, record).await;
    }

    async fn publish(&self, event: BookingEvent) {
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::error!("Failed to publish {} for {}: {}", event.topic(), event.key(), e);
        }
    }
}

fn method_of(method: &Option<String>) -> String {
    method.clone().unwrap_or_else(|| UNSPECIFIED_METHOD.to_string())
}

pub(crate) fn payment_event(record: &PaymentRecord) -> BookingEvent {
    BookingEvent::PaymentRecorded(PaymentRecordedEvent {
        payment_record_id: record.id,
        booking_id: record.booking_id,
        kind: record.kind.to_string(),
        status: record.status.to_string(),
        amount: record.amount,
        timestamp: Utc::now().timestamp(),
    })
}
