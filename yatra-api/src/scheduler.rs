use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use uuid::Uuid;
use yatra_booking::{BookingEngine, BookingError, TripInventory};
use yatra_core::{BookingStatus, Notifier, TripFilter};
use yatra_shared::events::{BookingEvent, TripReminderEvent};
use yatra_store::app_config::SchedulerConfig;
use yatra_store::RedisClient;

use crate::state::AppState;

/// Publishes one `trip.reminder` per confirmed booking whose trip departs
/// inside the window.
pub struct ReminderDispatcher {
    inventory: Arc<TripInventory>,
    engine: Arc<BookingEngine>,
    notifier: Arc<dyn Notifier>,
    redis: Option<Arc<RedisClient>>,
    window: ChronoDuration,
    // booking id -> departure, pruned once the trip has left
    sent: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl ReminderDispatcher {
    pub fn new(
        inventory: Arc<TripInventory>,
        engine: Arc<BookingEngine>,
        notifier: Arc<dyn Notifier>,
        redis: Option<Arc<RedisClient>>,
        window_hours: i64,
    ) -> Self {
        Self {
            inventory,
            engine,
            notifier,
            redis,
            window: ChronoDuration::hours(window_hours),
            sent: Mutex::new(HashMap::new()),
        }
    }

    /// Returns how many reminders went out.
    pub async fn dispatch(&self, now: DateTime<Utc>) -> Result<usize, BookingError> {
        self.sent.lock().await.retain(|_, departure| *departure > now);

        let trips = self
            .inventory
            .list(TripFilter {
                departs_after: Some(now),
                departs_before: Some(now + self.window),
                ..Default::default()
            })
            .await?;

        let mut published = 0;
        for trip in trips {
            let bookings = self.engine.list_for_trip(trip.id).await?;
            for booking in bookings.into_iter().filter(|b| b.booking_status == BookingStatus::Confirmed) {
                if !self.claim(booking.id, trip.departure_at, now).await {
                    continue;
                }

                let event = BookingEvent::TripReminder(TripReminderEvent {
                    booking_id: booking.id,
                    booking_number: booking.booking_number.clone(),
                    trip_id: trip.id,
                    user_id: booking.user_id.clone(),
                    trip_title: trip.title.clone(),
                    departure_at: trip.departure_at,
                    departure_clock: trip.departure_clock.clone(),
                    timestamp: now.timestamp(),
                });

                match self.notifier.publish(&event).await {
                    Ok(()) => published += 1,
                    Err(e) => {
                        tracing::error!("Failed to publish reminder for {}: {}", booking.booking_number, e);
                        self.sent.lock().await.remove(&booking.id);
                    }
                }
            }
        }

        if published > 0 {
            tracing::info!("Sent {} trip reminders", published);
        }
        Ok(published)
    }

    async fn claim(&self, booking_id: Uuid, departure: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        {
            let mut sent = self.sent.lock().await;
            if sent.contains_key(&booking_id) {
                return false;
            }
            sent.insert(booking_id, departure);
        }

        // Other replicas share the claim through Redis
        let Some(redis) = &self.redis else {
            return true;
        };
        let ttl = (departure - now).num_seconds().max(60) as u64;
        match redis.claim_reminder(booking_id, ttl).await {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!("Reminder claim unavailable for {}: {}", booking_id, e);
                true
            }
        }
    }
}

/// Start the regeneration and reminder loops. Both fire once immediately.
pub fn spawn(state: &AppState, config: &SchedulerConfig) -> Vec<JoinHandle<()>> {
    let regen = {
        let generator = state.generator.clone();
        let metrics = state.metrics.clone();
        let every = Duration::from_secs(config.regenerate_every_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match generator.regenerate(Utc::now()).await {
                    Ok(summary) => metrics.trips_generated.inc_by(summary.trips_created as u64),
                    Err(e) => tracing::error!("Scheduled trip generation failed: {}", e),
                }
            }
        })
    };

    let reminders = {
        let dispatcher = ReminderDispatcher::new(
            state.inventory.clone(),
            state.engine.clone(),
            state.notifier.clone(),
            state.redis.clone(),
            config.reminder_window_hours,
        );
        let metrics = state.metrics.clone();
        let every = Duration::from_secs(config.reminder_tick_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match dispatcher.dispatch(Utc::now()).await {
                    Ok(sent) => metrics.reminders_sent.inc_by(sent as u64),
                    Err(e) => tracing::error!("Reminder run failed: {}", e),
                }
            }
        })
    };

    vec![regen, reminders]
}

#[cfg(test)]
mod tests {
    use super::*;
    use yatra_booking::CreateBooking;
    use yatra_catalog::TripDraft;
    use yatra_core::{Gender, InMemoryStore, MaintenanceLock, MemoryNotifier, MockPaymentGateway, Passenger};

    struct Fixture {
        inventory: Arc<TripInventory>,
        engine: Arc<BookingEngine>,
        notifier: Arc<MemoryNotifier>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let maintenance = Arc::new(MaintenanceLock::new());
        let engine = BookingEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockPaymentGateway),
            notifier.clone(),
            maintenance.clone(),
        );
        Fixture {
            inventory: Arc::new(TripInventory::new(store, maintenance)),
            engine: Arc::new(engine),
            notifier,
        }
    }

    fn draft(departs_in_hours: i64) -> TripDraft {
        let departure = Utc::now() + ChronoDuration::hours(departs_in_hours);
        TripDraft {
            route_id: "delhi-haridwar".to_string(),
            destination_id: "har-ki-pauri".to_string(),
            title: "Haridwar Weekend".to_string(),
            description: None,
            departure_at: departure,
            return_at: departure + ChronoDuration::days(2),
            departure_clock: "04:30 AM".to_string(),
            return_clock: "11:30 PM".to_string(),
            total_seats: 10,
            price_per_seat: 1800,
            advance_price: Some(500),
            details: Default::default(),
            tour_type: None,
            weekend_date: None,
        }
    }

    async fn book(f: &Fixture, trip_id: Uuid) -> yatra_core::Booking {
        f.engine
            .create_booking(CreateBooking {
                user_id: "user-1".to_string(),
                trip_id,
                passengers: vec![Passenger { name: "Savitri".to_string(), age: 61, gender: Gender::Female }],
                advance_amount: None,
                payment_method: None,
                seat_labels: None,
            })
            .await
            .unwrap()
    }

    fn reminders(f: &Fixture) -> ReminderDispatcher {
        let notifier: Arc<dyn Notifier> = f.notifier.clone();
        ReminderDispatcher::new(f.inventory.clone(), f.engine.clone(), notifier, None, 48)
    }

    #[tokio::test]
    async fn test_reminder_sent_once_per_booking() {
        let f = fixture();
        let soon = f.inventory.create(draft(24)).await.unwrap();
        let later = f.inventory.create(draft(24 * 5)).await.unwrap();
        let booking = book(&f, soon.id).await;
        book(&f, later.id).await;

        let dispatcher = reminders(&f);
        assert_eq!(dispatcher.dispatch(Utc::now()).await.unwrap(), 1);
        assert_eq!(dispatcher.dispatch(Utc::now()).await.unwrap(), 0);

        let events = f.notifier.events().await;
        let sent: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                BookingEvent::TripReminder(r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].booking_id, booking.id);
        assert_eq!(sent[0].departure_clock, "04:30 AM");
    }

    #[tokio::test]
    async fn test_cancelled_bookings_get_no_reminder() {
        let f = fixture();
        let trip = f.inventory.create(draft(12)).await.unwrap();
        let booking = book(&f, trip.id).await;
        f.engine.cancel_booking(booking.id).await.unwrap();

        assert_eq!(reminders(&f).dispatch(Utc::now()).await.unwrap(), 0);
    }
}
