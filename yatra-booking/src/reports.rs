use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use yatra_catalog::{Trip, TripStatus};
use yatra_core::booking::{BookingStatus, PaymentKind, PaymentRecordStatus, PaymentStatus};
use yatra_core::repository::{BookingFilter, BookingRepository, PaymentFilter, PaymentRepository, TripFilter, TripRepository};

use crate::error::BookingError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripOccupancy {
    pub trip_id: Uuid,
    pub title: String,
    pub departure_at: DateTime<Utc>,
    pub status: TripStatus,
    pub total_seats: i32,
    pub booked_seats: i32,
    pub available_seats: i32,
    pub occupancy_pct: f64,
    pub confirmed_bookings: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevenueSummary {
    /// Completed advance and full payments
    pub collected: i64,
    /// Completed refunds
    pub refunded: i64,
    /// Refunds handed to the gateway and not yet settled
    pub refunds_in_flight: i64,
    /// Advance and full payments awaiting a gateway outcome
    pub pending: i64,
    /// Unpaid balance on confirmed bookings not yet fully paid
    pub outstanding_balance: i64,
    pub confirmed_bookings: usize,
    pub cancelled_bookings: usize,
}

/// Read-only views for operators
pub struct ReportService {
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
}

impl ReportService {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
    ) -> Self {
        Self { trips, bookings, payments }
    }

    pub async fn occupancy(&self, trip_id: Uuid) -> Result<TripOccupancy, BookingError> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| BookingError::TripNotFound(trip_id.to_string()))?;
        self.occupancy_of(trip).await
    }

    /// One row per active trip departing after `since`.
    pub async fn occupancy_report(&self, since: DateTime<Utc>) -> Result<Vec<TripOccupancy>, BookingError> {
        let filter = TripFilter {
            departs_after: Some(since),
            ..Default::default()
        };
        let trips = self.trips.list_trips(&filter).await?;

        let mut rows = Vec::with_capacity(trips.len());
        for trip in trips {
            rows.push(self.occupancy_of(trip).await?);
        }
        Ok(rows)
    }

    async fn occupancy_of(&self, trip: Trip) -> Result<TripOccupancy, BookingError> {
        let filter = BookingFilter {
            trip_id: Some(trip.id),
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        let confirmed = self.bookings.list_bookings(&filter).await?.len();

        Ok(TripOccupancy {
            trip_id: trip.id,
            occupancy_pct: (trip.occupancy() * 1000.0).round() / 10.0,
            booked_seats: trip.booked_seats(),
            title: trip.title,
            departure_at: trip.departure_at,
            status: trip.status,
            total_seats: trip.total_seats,
            available_seats: trip.available_seats,
            confirmed_bookings: confirmed,
        })
    }

    pub async fn revenue_summary(&self) -> Result<RevenueSummary, BookingError> {
        let records = self.payments.list_payments(&PaymentFilter::default()).await?;
        let bookings = self.bookings.list_bookings(&BookingFilter::default()).await?;

        let mut summary = RevenueSummary::default();

        for record in &records {
            match (record.kind, record.status) {
                (PaymentKind::Refund, PaymentRecordStatus::Completed) => summary.refunded += record.amount,
                (PaymentKind::Refund, PaymentRecordStatus::Failed) => {}
                (PaymentKind::Refund, _) => summary.refunds_in_flight += record.amount,
                (_, PaymentRecordStatus::Completed) => summary.collected += record.amount,
                (_, PaymentRecordStatus::Failed) => {}
                _ => summary.pending += record.amount,
            }
        }

        for booking in &bookings {
            match booking.booking_status {
                BookingStatus::Confirmed => {
                    summary.confirmed_bookings += 1;
                    if booking.payment_status != PaymentStatus::FullPaid {
                        summary.outstanding_balance += booking.balance_due();
                    }
                }
                BookingStatus::Cancelled => summary.cancelled_bookings += 1,
                BookingStatus::Completed => {}
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BookingEngine, CreateBooking};
    use crate::ledger::PaymentLedger;
    use chrono::Duration;
    use yatra_catalog::TripDraft;
    use yatra_core::booking::{Gender, Passenger};
    use yatra_core::{InMemoryStore, MaintenanceLock, MemoryNotifier, MockPaymentGateway};

    #[tokio::test]
    async fn test_occupancy_and_revenue() {
        let store = Arc::new(InMemoryStore::new());
        let departure = Utc::now() + Duration::days(8);
        let trip = TripDraft {
            route_id: "delhi-jaipur".to_string(),
            destination_id: "salasar-balaji".to_string(),
            title: "Rajasthan Weekend".to_string(),
            description: None,
            departure_at: departure,
            return_at: departure + Duration::days(2),
            departure_clock: "05:00 AM".to_string(),
            return_clock: "10:00 PM".to_string(),
            total_seats: 8,
            price_per_seat: 2000,
            advance_price: Some(500),
            details: Default::default(),
            tour_type: None,
            weekend_date: None,
        }
        .into_trip()
        .unwrap();
        store.insert_trip(&trip).await.unwrap();

        let notifier = Arc::new(MemoryNotifier::new());
        let engine = BookingEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockPaymentGateway),
            notifier.clone(),
            Arc::new(MaintenanceLock::new()),
        );
        let ledger = PaymentLedger::new(store.clone(), store.clone(), Arc::new(MockPaymentGateway), notifier);
        let reports = ReportService::new(store.clone(), store.clone(), store.clone());

        let party = |n: usize, advance: Option<i64>| CreateBooking {
            user_id: "user-9".to_string(),
            trip_id: trip.id,
            passengers: (0..n)
                .map(|i| Passenger { name: format!("Yatri {}", i), age: 50, gender: Gender::Male })
                .collect(),
            advance_amount: advance,
            payment_method: Some("CARD".to_string()),
            seat_labels: None,
        };

        // 2 seats, advance 1000 settled by the gateway
        let first = engine.create_booking(party(2, Some(1000))).await.unwrap();
        let advance = ledger.history(first.id).await.unwrap().remove(0);
        ledger.record_outcome(advance.id, PaymentRecordStatus::Completed).await.unwrap();

        // 1 seat, fully paid at the counter
        let second = engine.create_booking(party(1, None)).await.unwrap();
        engine.confirm_payment(second.id).await.unwrap();

        // 1 seat with a pending advance, then cancelled
        let third = engine.create_booking(party(1, Some(500))).await.unwrap();
        engine.cancel_booking(third.id).await.unwrap();

        let occupancy = reports.occupancy(trip.id).await.unwrap();
        assert_eq!(occupancy.booked_seats, 3);
        assert_eq!(occupancy.available_seats, 5);
        assert_eq!(occupancy.confirmed_bookings, 2);
        assert_eq!(occupancy.occupancy_pct, 37.5);

        let revenue = reports.revenue_summary().await.unwrap();
        assert_eq!(revenue.collected, 1000 + 2000);
        assert_eq!(revenue.pending, 500);
        assert_eq!(revenue.refunds_in_flight, 2000);
        assert_eq!(revenue.refunded, 0);
        assert_eq!(revenue.outstanding_balance, 3000);
        assert_eq!(revenue.confirmed_bookings, 2);
        assert_eq!(revenue.cancelled_bookings, 1);

        let rows = reports.occupancy_report(Utc::now()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
