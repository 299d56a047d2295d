//! Postgres repository tests. They need a scratch database and are skipped
//! unless `DATABASE_URL` is set.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;
use yatra_catalog::{Trip, TripDraft, TripStatus};
use yatra_core::booking::{
    parse_booking_number, BookingDraft, Gender, Passenger, PaymentKind, PaymentRecord, PaymentRecordStatus,
    PaymentStatus,
};
use yatra_core::repository::{
    BookingRepository, PaymentRepository, Reservation, StoreError, TripRepository, UpsertOutcome,
};
use yatra_store::{DbClient, PgBookingRepository, PgTripRepository};

async fn connect() -> Option<DbClient> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres repository test");
        return None;
    };
    let db = DbClient::new(&url, 4).await.expect("connect to DATABASE_URL");
    db.migrate().await.expect("run migrations");
    Some(db)
}

/// Each test works on its own tour type so parallel runs never share a row.
fn generated_trip(tour_type: &str, seats: i32, price: i64) -> Trip {
    let departure = Utc::now() + Duration::days(30);
    TripDraft {
        route_id: "delhi-ayodhya".to_string(),
        destination_id: "ram-janmabhoomi".to_string(),
        title: "Ayodhya Weekend".to_string(),
        description: None,
        departure_at: departure,
        return_at: departure + Duration::days(2),
        departure_clock: "09:00 PM".to_string(),
        return_clock: "06:00 AM".to_string(),
        total_seats: seats,
        price_per_seat: price,
        advance_price: Some(500),
        details: Default::default(),
        tour_type: Some(tour_type.to_string()),
        weekend_date: NaiveDate::from_ymd_opt(2099, 3, 7),
    }
    .into_trip()
    .unwrap()
}

fn booking_draft(trip_id: Uuid, passengers: usize) -> BookingDraft {
    BookingDraft {
        id: Uuid::new_v4(),
        user_id: "user-pg".to_string(),
        trip_id,
        passengers: (0..passengers)
            .map(|i| Passenger { name: format!("Yatri {}", i + 1), age: 35, gender: Gender::Male })
            .collect(),
        seat_labels: (0..passengers).map(|i| format!("S{}", i + 1)).collect(),
        total_amount: 2000 * passengers as i64,
        advance_amount: None,
        payment_status: PaymentStatus::Pending,
        payment_method: Some("UPI".to_string()),
        created_at: Utc::now(),
    }
}

fn tour_type() -> String {
    format!("pg-test-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_seat_update_honours_expected_count() {
    let Some(db) = connect().await else { return };
    let trips = PgTripRepository::new(db.pool.clone());
    let trip = generated_trip(&tour_type(), 5, 2000);
    trips.insert_trip(&trip).await.unwrap();

    let updated = trips.adjust_seats(trip.id, -2, Some(5)).await.unwrap();
    assert_eq!(updated.available_seats, 3);

    let stale = trips.adjust_seats(trip.id, -1, Some(5)).await;
    assert!(matches!(stale, Err(StoreError::Conflict(_))));

    let too_many = trips.adjust_seats(trip.id, -4, None).await;
    assert!(matches!(too_many, Err(StoreError::InsufficientSeats { requested: 4, available: 3 })));

    let full = trips.adjust_seats(trip.id, -3, Some(3)).await.unwrap();
    assert_eq!(full.status, TripStatus::Full);
    let reopened = trips.adjust_seats(trip.id, 1, Some(0)).await.unwrap();
    assert_eq!(reopened.status, TripStatus::Upcoming);
}

#[tokio::test]
async fn test_generated_trip_upsert_keys_on_weekend_and_tour() {
    let Some(db) = connect().await else { return };
    let trips = PgTripRepository::new(db.pool.clone());
    let bookings = PgBookingRepository::new(db.pool.clone());
    let tour = tour_type();

    let created = match trips.upsert_generated(&generated_trip(&tour, 10, 2000)).await.unwrap() {
        UpsertOutcome::Created(trip) => trip,
        other => panic!("expected a new trip, got {:?}", other),
    };

    let refreshed = match trips.upsert_generated(&generated_trip(&tour, 10, 2400)).await.unwrap() {
        UpsertOutcome::Refreshed(trip) => trip,
        other => panic!("expected a refresh, got {:?}", other),
    };
    assert_eq!(refreshed.id, created.id);
    assert_eq!(refreshed.price_per_seat, 2400);

    bookings
        .commit_reservation(Reservation {
            draft: booking_draft(created.id, 2),
            expected_available: 10,
            advance_payment: None,
        })
        .await
        .unwrap();

    match trips.upsert_generated(&generated_trip(&tour, 10, 3000)).await.unwrap() {
        UpsertOutcome::Retained(trip) => {
            assert_eq!(trip.id, created.id);
            assert_eq!(trip.price_per_seat, 2400);
            assert_eq!(trip.available_seats, 8);
        }
        other => panic!("booked trip must be kept, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reservation_draws_numbers_from_sequence() {
    let Some(db) = connect().await else { return };
    let trips = PgTripRepository::new(db.pool.clone());
    let bookings = PgBookingRepository::new(db.pool.clone());
    let trip = generated_trip(&tour_type(), 4, 2000);
    trips.insert_trip(&trip).await.unwrap();

    let first = bookings
        .commit_reservation(Reservation { draft: booking_draft(trip.id, 1), expected_available: 4, advance_payment: None })
        .await
        .unwrap();
    let second = bookings
        .commit_reservation(Reservation { draft: booking_draft(trip.id, 2), expected_available: 3, advance_payment: None })
        .await
        .unwrap();
    assert_eq!(second.trip.available_seats, 1);

    let year = Utc::now().year();
    let (first_year, first_seq) = parse_booking_number(&first.booking.booking_number).unwrap();
    let (second_year, second_seq) = parse_booking_number(&second.booking.booking_number).unwrap();
    assert_eq!((first_year, second_year), (year, year));
    assert!(second_seq > first_seq);
    assert!(first.booking.booking_number.starts_with(&format!("WKD-{}-", year)));
    assert!(first.booking.booking_number.rsplit('-').next().unwrap().len() >= 3);

    let stale = bookings
        .commit_reservation(Reservation { draft: booking_draft(trip.id, 1), expected_available: 4, advance_payment: None })
        .await;
    assert!(matches!(stale, Err(StoreError::Conflict(_))));
    assert_eq!(trips.get_trip(trip.id).await.unwrap().unwrap().available_seats, 1);

    let found = bookings.find_by_number(&second.booking.booking_number).await.unwrap().unwrap();
    assert_eq!(found.id, second.booking.id);
}

#[tokio::test]
async fn test_failed_payment_is_retried_at_most_once() {
    let Some(db) = connect().await else { return };
    let trips = PgTripRepository::new(db.pool.clone());
    let bookings = PgBookingRepository::new(db.pool.clone());
    let trip = generated_trip(&tour_type(), 3, 2000);
    trips.insert_trip(&trip).await.unwrap();
    let receipt = bookings
        .commit_reservation(Reservation { draft: booking_draft(trip.id, 1), expected_available: 3, advance_payment: None })
        .await
        .unwrap();

    let failed = PaymentRecord::new(receipt.booking.id, 500, PaymentKind::Advance, PaymentRecordStatus::Failed, "UPI");
    bookings.append_payment(&failed).await.unwrap();

    bookings.append_payment(&failed.retry()).await.unwrap();
    let second = bookings.append_payment(&failed.retry()).await;
    assert!(matches!(second, Err(StoreError::Duplicate(_))));
}
