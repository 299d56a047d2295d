use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use yatra_catalog::{Trip, TripDraft};
use yatra_core::repository::{ClearSummary, TripFilter, TripRepository};
use yatra_core::MaintenanceLock;

use crate::error::BookingError;

/// Operator-facing view of the seat inventory
pub struct TripInventory {
    trips: Arc<dyn TripRepository>,
    maintenance: Arc<MaintenanceLock>,
}

impl TripInventory {
    pub fn new(trips: Arc<dyn TripRepository>, maintenance: Arc<MaintenanceLock>) -> Self {
        Self { trips, maintenance }
    }

    pub async fn create(&self, draft: TripDraft) -> Result<Trip, BookingError> {
        let trip = draft.into_trip()?;
        self.trips.insert_trip(&trip).await?;
        tracing::info!("Trip {} created: {} with {} seats", trip.id, trip.title, trip.total_seats);
        Ok(trip)
    }

    /// Missing and switched-off trips look the same to callers.
    pub async fn get(&self, trip_id: Uuid) -> Result<Trip, BookingError> {
        match self.trips.get_trip(trip_id).await? {
            Some(trip) if trip.is_active => Ok(trip),
            _ => Err(BookingError::TripNotFound(trip_id.to_string())),
        }
    }

    /// Active trips departing from now on, earliest first.
    pub async fn list(&self, mut filter: TripFilter) -> Result<Vec<Trip>, BookingError> {
        let now = Utc::now();
        filter.departs_after = Some(filter.departs_after.map_or(now, |after| after.max(now)));
        filter.include_inactive = false;
        Ok(self.trips.list_trips(&filter).await?)
    }

    pub async fn deactivate(&self, trip_id: Uuid) -> Result<Trip, BookingError> {
        let trip = self.trips.set_active(trip_id, false).await.map_err(|e| match e {
            yatra_core::StoreError::NotFound(_) => BookingError::TripNotFound(trip_id.to_string()),
            other => other.into(),
        })?;
        tracing::info!("Trip {} deactivated", trip_id);
        Ok(trip)
    }

    /// Remove unsold future trips while nobody is booking.
    pub async fn clear_upcoming(&self, now: DateTime<Utc>) -> Result<ClearSummary, BookingError> {
        let _maintenance = self.maintenance.exclusive().await;
        let summary = self.trips.clear_upcoming(now).await?;
        tracing::info!(
            "Cleared upcoming trips: {} removed, {} deactivated, {} kept for bookings",
            summary.removed,
            summary.deactivated,
            summary.retained_with_bookings
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use yatra_core::InMemoryStore;

    fn draft(days_out: i64, seats: i32) -> TripDraft {
        let departure = Utc::now() + Duration::days(days_out);
        TripDraft {
            route_id: "delhi-haridwar".to_string(),
            destination_id: "har-ki-pauri".to_string(),
            title: "Haridwar Ganga Aarti".to_string(),
            description: Some("Evening aarti at Har Ki Pauri".to_string()),
            departure_at: departure,
            return_at: departure + Duration::days(2),
            departure_clock: "04:30 AM".to_string(),
            return_clock: "11:00 PM".to_string(),
            total_seats: seats,
            price_per_seat: 1800,
            advance_price: Some(500),
            details: Default::default(),
            tour_type: None,
            weekend_date: None,
        }
    }

    fn inventory() -> TripInventory {
        TripInventory::new(Arc::new(InMemoryStore::new()), Arc::new(MaintenanceLock::new()))
    }

    #[tokio::test]
    async fn test_create_rejects_bad_drafts() {
        let inventory = inventory();

        let mut no_seats = draft(3, 0);
        no_seats.total_seats = 0;
        assert!(matches!(inventory.create(no_seats).await, Err(BookingError::InvalidRequest(_))));

        let mut pricey_advance = draft(3, 10);
        pricey_advance.advance_price = Some(5000);
        assert!(matches!(inventory.create(pricey_advance).await, Err(BookingError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_deactivated_trips_are_hidden() {
        let inventory = inventory();
        let later = inventory.create(draft(10, 10)).await.unwrap();
        let sooner = inventory.create(draft(3, 10)).await.unwrap();
        inventory.create(draft(-3, 10)).await.unwrap();

        let listed = inventory.list(TripFilter::default()).await.unwrap();
        assert_eq!(listed.iter().map(|t| t.id).collect::<Vec<_>>(), vec![sooner.id, later.id]);

        inventory.deactivate(later.id).await.unwrap();
        assert!(matches!(inventory.get(later.id).await, Err(BookingError::TripNotFound(_))));
        assert_eq!(inventory.list(TripFilter::default()).await.unwrap().len(), 1);

        assert!(matches!(
            inventory.deactivate(Uuid::new_v4()).await,
            Err(BookingError::TripNotFound(_))
        ));
    }
}
