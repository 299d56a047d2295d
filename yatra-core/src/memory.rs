use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use yatra_catalog::{Trip, TripStatus};

use crate::booking::{Booking, BookingStatus, PaymentRecord, PaymentRecordStatus, PaymentStatus};
use crate::repository::*;

#[derive(Default)]
struct MemoryState {
    trips: HashMap<Uuid, Trip>,
    bookings: HashMap<Uuid, Booking>,
    payments: Vec<PaymentRecord>,
    booking_sequence: i64,
}

/// Process-local store. Every commit runs inside one critical section, which
/// gives it the same all-or-nothing behaviour as a database transaction.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmed and completed passengers per trip, for invariant checks
    pub async fn seats_held(&self, trip_id: Uuid) -> i32 {
        let state = self.state.lock().await;
        state
            .bookings
            .values()
            .filter(|b| b.trip_id == trip_id && b.holds_seats())
            .map(|b| b.passenger_count)
            .sum()
    }
}

fn generated_key(trip: &Trip) -> Option<(chrono::NaiveDate, &str)> {
    match (trip.weekend_date, trip.tour_type.as_deref()) {
        (Some(date), Some(tour)) => Some((date, tour)),
        _ => None,
    }
}

#[async_trait]
impl TripRepository for InMemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<()> {
        let mut state = self.state.lock().await;

        if state.trips.contains_key(&trip.id) {
            return Err(StoreError::Duplicate(format!("trip {}", trip.id)));
        }
        if let Some(key) = generated_key(trip) {
            if state.trips.values().any(|t| generated_key(t) == Some(key)) {
                return Err(StoreError::Duplicate(format!("trip for {} {}", key.0, key.1)));
            }
        }

        state.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let state = self.state.lock().await;
        Ok(state.trips.get(&id).cloned())
    }

    async fn list_trips(&self, filter: &TripFilter) -> StoreResult<Vec<Trip>> {
        let state = self.state.lock().await;
        let mut trips: Vec<Trip> = state.trips.values().filter(|t| filter.matches(t)).cloned().collect();
        trips.sort_by_key(|t| t.departure_at);
        Ok(trips)
    }

    async fn adjust_seats(
        &self,
        id: Uuid,
        delta: i32,
        expected_available: Option<i32>,
    ) -> StoreResult<Trip> {
        let mut state = self.state.lock().await;
        let trip = state
            .trips
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", id)))?;

        if let Some(expected) = expected_available {
            if trip.available_seats != expected {
                return Err(StoreError::Conflict(format!(
                    "trip {} seats moved from {} to {}",
                    id, expected, trip.available_seats
                )));
            }
        }

        trip.apply_seat_delta(delta)?;
        Ok(trip.clone())
    }

    async fn upsert_generated(&self, trip: &Trip) -> StoreResult<UpsertOutcome> {
        let key = generated_key(trip)
            .ok_or_else(|| StoreError::Invalid("generated trip needs weekend_date and tour_type".to_string()))?;

        let mut state = self.state.lock().await;
        let existing = state.trips.values_mut().find(|t| generated_key(t) == Some(key));

        let Some(existing) = existing else {
            state.trips.insert(trip.id, trip.clone());
            return Ok(UpsertOutcome::Created(trip.clone()));
        };

        if existing.has_bookings() || !existing.is_active {
            return Ok(UpsertOutcome::Retained(existing.clone()));
        }

        existing.title = trip.title.clone();
        existing.description = trip.description.clone();
        existing.departure_at = trip.departure_at;
        existing.return_at = trip.return_at;
        existing.departure_clock = trip.departure_clock.clone();
        existing.return_clock = trip.return_clock.clone();
        existing.total_seats = trip.total_seats;
        existing.available_seats = trip.total_seats;
        existing.price_per_seat = trip.price_per_seat;
        existing.advance_price = trip.advance_price;
        existing.details = trip.details.clone();
        existing.status = TripStatus::Upcoming;
        existing.updated_at = Utc::now();

        Ok(UpsertOutcome::Refreshed(existing.clone()))
    }

    async fn set_active(&self, id: Uuid, active: bool) -> StoreResult<Trip> {
        let mut state = self.state.lock().await;
        let trip = state
            .trips
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", id)))?;
        trip.is_active = active;
        trip.updated_at = Utc::now();
        Ok(trip.clone())
    }

    async fn clear_upcoming(&self, now: DateTime<Utc>) -> StoreResult<ClearSummary> {
        let mut state = self.state.lock().await;
        let mut summary = ClearSummary::default();

        let future: Vec<Uuid> = state
            .trips
            .values()
            .filter(|t| t.departure_at > now)
            .map(|t| t.id)
            .collect();

        for trip_id in future {
            let (live, any) = state
                .bookings
                .values()
                .filter(|b| b.trip_id == trip_id)
                .fold((false, false), |(live, _), b| (live || b.holds_seats(), true));

            if live {
                summary.retained_with_bookings += 1;
            } else if any {
                if let Some(trip) = state.trips.get_mut(&trip_id) {
                    if trip.is_active {
                        trip.is_active = false;
                        trip.updated_at = now;
                        summary.deactivated += 1;
                    }
                }
            } else {
                state.trips.remove(&trip_id);
                summary.removed += 1;
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn commit_reservation(&self, reservation: Reservation) -> StoreResult<ReservationReceipt> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let draft = reservation.draft;

        if state.bookings.contains_key(&draft.id) {
            return Err(StoreError::Duplicate(format!("booking {}", draft.id)));
        }

        let trip = state
            .trips
            .get_mut(&draft.trip_id)
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", draft.trip_id)))?;

        if !trip.is_bookable() {
            return Err(StoreError::Conflict(format!("trip {} stopped taking bookings", trip.id)));
        }
        if trip.available_seats != reservation.expected_available {
            return Err(StoreError::Conflict(format!(
                "trip {} seats moved from {} to {}",
                trip.id, reservation.expected_available, trip.available_seats
            )));
        }

        trip.apply_seat_delta(-draft.passenger_count())?;
        let trip = trip.clone();

        state.booking_sequence += 1;
        let booking = draft.into_booking(state.booking_sequence);
        state.bookings.insert(booking.id, booking.clone());

        if let Some(record) = &reservation.advance_payment {
            state.payments.push(record.clone());
        }

        Ok(ReservationReceipt {
            booking,
            trip,
            advance_payment: reservation.advance_payment,
        })
    }

    async fn commit_cancellation(&self, cancellation: Cancellation) -> StoreResult<CancellationReceipt> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let booking = state
            .bookings
            .get_mut(&cancellation.booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", cancellation.booking_id)))?;

        if booking.booking_status != BookingStatus::Confirmed
            || booking.payment_status != cancellation.expected_payment_status
        {
            return Err(StoreError::Conflict(format!(
                "booking {} changed to {}/{}",
                booking.booking_number, booking.booking_status, booking.payment_status
            )));
        }

        let trip = state
            .trips
            .get_mut(&booking.trip_id)
            .ok_or_else(|| StoreError::NotFound(format!("trip {}", booking.trip_id)))?;

        // Seat release is checked before anything is written.
        trip.seats_after(booking.passenger_count)?;
        trip.apply_seat_delta(booking.passenger_count)?;

        let now = Utc::now();
        booking.booking_status = BookingStatus::Cancelled;
        booking.payment_status = cancellation.payment_status;
        booking.updated_at = now;

        let receipt = CancellationReceipt {
            booking: booking.clone(),
            trip: trip.clone(),
            refund: cancellation.refund.clone(),
        };

        if let Some(refund) = cancellation.refund {
            state.payments.push(refund);
        }

        Ok(receipt)
    }

    async fn commit_settlement(&self, settlement: Settlement) -> StoreResult<Booking> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let booking = state
            .bookings
            .get_mut(&settlement.booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", settlement.booking_id)))?;

        if booking.booking_status != BookingStatus::Confirmed
            || booking.payment_status != settlement.expected_payment_status
        {
            return Err(StoreError::Conflict(format!(
                "booking {} changed to {}/{}",
                booking.booking_number, booking.booking_status, booking.payment_status
            )));
        }

        booking.payment_status = PaymentStatus::FullPaid;
        booking.updated_at = Utc::now();
        let booking = booking.clone();

        state.payments.push(settlement.payment);
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state.bookings.get(&id).cloned())
    }

    async fn find_by_number(&self, booking_number: &str) -> StoreResult<Option<Booking>> {
        let state = self.state.lock().await;
        Ok(state.bookings.values().find(|b| b.booking_number == booking_number).cloned())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state.bookings.values().filter(|b| filter.matches(b)).cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn append_payment(&self, record: &PaymentRecord) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.payments.iter().any(|p| p.id == record.id) {
            return Err(StoreError::Duplicate(format!("payment record {}", record.id)));
        }
        if let Some(original) = record.retry_of {
            if state.payments.iter().any(|p| p.retry_of == Some(original)) {
                return Err(StoreError::Duplicate(format!("retry of payment record {}", original)));
            }
        }
        if !state.bookings.contains_key(&record.booking_id) {
            return Err(StoreError::NotFound(format!("booking {}", record.booking_id)));
        }
        state.payments.push(record.clone());
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> StoreResult<Option<PaymentRecord>> {
        let state = self.state.lock().await;
        Ok(state.payments.iter().find(|p| p.id == id).cloned())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<PaymentRecord>> {
        let state = self.state.lock().await;
        Ok(state.payments.iter().filter(|p| filter.matches(p)).cloned().collect())
    }

    async fn update_payment_status(
        &self,
        id: Uuid,
        expected: PaymentRecordStatus,
        status: PaymentRecordStatus,
    ) -> StoreResult<PaymentRecord> {
        let mut state = self.state.lock().await;
        let record = state
            .payments
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("payment record {}", id)))?;

        if record.status != expected {
            return Err(StoreError::Conflict(format!(
                "payment record {} is {} not {}",
                id, record.status, expected
            )));
        }

        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}
