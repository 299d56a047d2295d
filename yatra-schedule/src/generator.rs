use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use yatra_catalog::{upcoming_weekends, CalendarEntry, PricingPolicy, Trip, TripStatus};
use yatra_core::repository::{StoreError, TripRepository, UpsertOutcome};
use yatra_core::MaintenanceLock;

use crate::tours::{default_tours, TourDefinition};

/// India Standard Time, UTC+05:30
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Days from the Saturday departure to the return leg
pub const RETURN_AFTER_DAYS: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub weeks_ahead: u32,
    pub tours: Vec<TourDefinition>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            weeks_ahead: 12,
            tours: default_tours(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationSummary {
    pub trips_created: usize,
    pub trips_refreshed: usize,
    pub trips_retained: usize,
    pub weekends_covered: usize,
    /// First and last weekend considered
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Fills the next few weekends with priced trips for every configured tour.
pub struct TripGenerator {
    trips: Arc<dyn TripRepository>,
    pricing: PricingPolicy,
    config: GeneratorConfig,
    maintenance: Arc<MaintenanceLock>,
}

impl TripGenerator {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        pricing: PricingPolicy,
        config: GeneratorConfig,
        maintenance: Arc<MaintenanceLock>,
    ) -> Self {
        Self {
            trips,
            pricing,
            config,
            maintenance,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Upsert one trip per weekend and tour. Running it again with the same
    /// `now` creates nothing new, and trips with sold seats are never touched.
    pub async fn regenerate(&self, now: DateTime<Utc>) -> Result<GenerationSummary, GeneratorError> {
        let _maintenance = self.maintenance.exclusive().await;

        let today = ist_today(now)?;
        let weekends = upcoming_weekends(today, self.config.weeks_ahead);
        let mut summary = GenerationSummary {
            weekends_covered: weekends.len(),
            date_range: weekends.first().zip(weekends.last()).map(|(a, b)| (a.date, b.date)),
            ..Default::default()
        };

        for entry in &weekends {
            for tour in &self.config.tours {
                let trip = self.build_trip(tour, entry)?;
                if trip.departure_at <= now {
                    tracing::debug!("Skipping {} on {}: already departed", tour.tour_type, entry.date);
                    continue;
                }

                match self.trips.upsert_generated(&trip).await? {
                    UpsertOutcome::Created(_) => summary.trips_created += 1,
                    UpsertOutcome::Refreshed(_) => summary.trips_refreshed += 1,
                    UpsertOutcome::Retained(existing) => {
                        tracing::debug!(
                            "Keeping trip {} for {} on {} ({} seats sold)",
                            existing.id,
                            tour.tour_type,
                            entry.date,
                            existing.booked_seats()
                        );
                        summary.trips_retained += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Trip generation done: {} created, {} refreshed, {} retained over {} weekends",
            summary.trips_created,
            summary.trips_refreshed,
            summary.trips_retained,
            summary.weekends_covered
        );
        Ok(summary)
    }

    /// Priced trip for one tour on one weekend, not yet stored.
    pub fn build_trip(&self, tour: &TourDefinition, entry: &CalendarEntry) -> Result<Trip, GeneratorError> {
        let quote = self.pricing.quote(&tour.tour_type, entry);

        let departure_time = tour
            .departure_time()
            .ok_or_else(|| GeneratorError::InvalidTour(format!("{}: bad departure clock", tour.tour_type)))?;
        let return_time = tour
            .return_time()
            .ok_or_else(|| GeneratorError::InvalidTour(format!("{}: bad return clock", tour.tour_type)))?;

        let departure_at = ist_to_utc(entry.date, departure_time)?;
        let return_at = ist_to_utc(entry.date + Duration::days(RETURN_AFTER_DAYS), return_time)?;

        let title = match &entry.occasion {
            Some(occasion) => format!("{} ({})", tour.title, occasion),
            None => tour.title.clone(),
        };

        let now = Utc::now();
        Ok(Trip {
            id: Uuid::new_v4(),
            route_id: tour.route_id.clone(),
            destination_id: tour.destination_id.clone(),
            title,
            description: tour.description.clone(),
            departure_at,
            return_at,
            departure_clock: tour.departure_clock.clone(),
            return_clock: tour.return_clock.clone(),
            total_seats: tour.capacity,
            available_seats: tour.capacity,
            price_per_seat: quote.base_price,
            advance_price: Some(quote.advance_price),
            status: TripStatus::Upcoming,
            details: tour.details.clone(),
            is_active: true,
            tour_type: Some(tour.tour_type.clone()),
            weekend_date: Some(entry.date),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Calendar date on the IST wall clock, which is what departures follow.
fn ist_today(now: DateTime<Utc>) -> Result<NaiveDate, GeneratorError> {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)
        .ok_or_else(|| GeneratorError::InvalidTour("bad IST offset".to_string()))?;
    Ok(now.with_timezone(&ist).date_naive())
}

fn ist_to_utc(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, GeneratorError> {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECS)
        .ok_or_else(|| GeneratorError::InvalidTour("bad IST offset".to_string()))?;
    ist.from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| GeneratorError::InvalidTour(format!("no IST instant for {} {}", date, time)))
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Invalid tour definition: {0}")]
    InvalidTour(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use yatra_catalog::PricingConfig;
    use yatra_core::repository::TripFilter;
    use yatra_core::InMemoryStore;

    fn generator(store: Arc<InMemoryStore>) -> TripGenerator {
        TripGenerator::new(
            store,
            PricingPolicy::new(PricingConfig::default()),
            GeneratorConfig::default(),
            Arc::new(MaintenanceLock::new()),
        )
    }

    fn wednesday() -> DateTime<Utc> {
        // 2025-02-05 09:00 IST
        Utc.with_ymd_and_hms(2025, 2, 5, 3, 30, 0).unwrap()
    }

    #[test]
    fn test_departure_uses_ist_clock() {
        let gen = generator(Arc::new(InMemoryStore::new()));
        let entry = CalendarEntry::regular(NaiveDate::from_ymd_opt(2025, 2, 8).unwrap());
        let tour = &gen.config().tours[0];

        let trip = gen.build_trip(tour, &entry).unwrap();
        // 05:00 IST is 23:30 UTC the evening before
        assert_eq!(trip.departure_at, Utc.with_ymd_and_hms(2025, 2, 7, 23, 30, 0).unwrap());
        // 11:00 PM IST on Monday
        assert_eq!(trip.return_at, Utc.with_ymd_and_hms(2025, 2, 10, 17, 30, 0).unwrap());
        assert_eq!(trip.price_per_seat, 2000);
        assert_eq!(trip.advance_price, Some(500));
        assert_eq!(trip.available_seats, trip.total_seats);
    }

    #[test]
    fn test_holiday_weekend_is_priced_up() {
        let gen = generator(Arc::new(InMemoryStore::new()));
        let entry = CalendarEntry::holiday(NaiveDate::from_ymd_opt(2025, 10, 18).unwrap(), "Diwali Weekend");
        let tour = &gen.config().tours[0];

        let trip = gen.build_trip(tour, &entry).unwrap();
        assert_eq!(trip.price_per_seat, 2600);
        assert_eq!(trip.advance_price, Some(650));
        assert!(trip.title.contains("Diwali Weekend"));
    }

    #[tokio::test]
    async fn test_regenerate_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let gen = generator(store.clone());

        let first = gen.regenerate(wednesday()).await.unwrap();
        assert_eq!(first.weekends_covered, 12);
        assert_eq!(first.trips_created, 48);
        assert_eq!(
            first.date_range,
            Some((
                NaiveDate::from_ymd_opt(2025, 2, 8).unwrap(),
                NaiveDate::from_ymd_opt(2025, 4, 26).unwrap()
            ))
        );

        let second = gen.regenerate(wednesday()).await.unwrap();
        assert_eq!(second.trips_created, 0);
        assert_eq!(second.trips_refreshed, 48);

        let all = store
            .list_trips(&TripFilter { include_inactive: true, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(all.len(), 48);
    }

    #[tokio::test]
    async fn test_booked_trips_survive_regeneration() {
        let store = Arc::new(InMemoryStore::new());
        let gen = generator(store.clone());
        gen.regenerate(wednesday()).await.unwrap();

        let trips = store.list_trips(&TripFilter::default()).await.unwrap();
        let booked = &trips[0];
        store.adjust_seats(booked.id, -3, Some(booked.available_seats)).await.unwrap();

        let summary = gen.regenerate(wednesday()).await.unwrap();
        assert_eq!(summary.trips_retained, 1);
        assert_eq!(summary.trips_refreshed, 47);

        let after = store.get_trip(booked.id).await.unwrap().unwrap();
        assert_eq!(after.available_seats, booked.available_seats - 3);
        assert_eq!(after.price_per_seat, booked.price_per_seat);
    }

    #[tokio::test]
    async fn test_saturday_after_departure_skips_today() {
        let store = Arc::new(InMemoryStore::new());
        let gen = generator(store.clone());

        // Saturday 2025-02-08 at noon IST: every tour but the 9 PM Ayodhya bus has left.
        let saturday_noon = Utc.with_ymd_and_hms(2025, 2, 8, 6, 30, 0).unwrap();
        let summary = gen.regenerate(saturday_noon).await.unwrap();
        assert_eq!(summary.trips_created, 48 - 3);
    }

    #[tokio::test]
    async fn test_weekends_follow_the_ist_calendar() {
        let store = Arc::new(InMemoryStore::new());
        let gen = generator(store.clone());

        // Still Saturday in UTC, already Sunday 01:30 in IST.
        let late_saturday = Utc.with_ymd_and_hms(2025, 2, 8, 20, 0, 0).unwrap();
        let summary = gen.regenerate(late_saturday).await.unwrap();

        let first = summary.date_range.unwrap().0;
        assert_eq!(first, NaiveDate::from_ymd_opt(2025, 2, 15).unwrap());
        assert_eq!(summary.trips_created, 48);
    }
}
