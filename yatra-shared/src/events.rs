use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;

pub const TOPIC_BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const TOPIC_BOOKING_CANCELLED: &str = "booking.cancelled";
pub const TOPIC_TRIP_REMINDER: &str = "trip.reminder";
pub const TOPIC_PAYMENT_RECORDED: &str = "payment.recorded";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub trip_id: Uuid,
    pub user_id: String,
    pub passenger_count: i32,
    pub lead_passenger: Masked<String>,
    pub seat_labels: Vec<String>,
    pub total_amount: i64,
    pub advance_amount: Option<i64>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub trip_id: Uuid,
    pub user_id: String,
    pub seats_released: i32,
    pub refund_amount: Option<i64>,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TripReminderEvent {
    pub booking_id: Uuid,
    pub booking_number: String,
    pub trip_id: Uuid,
    pub user_id: String,
    pub trip_title: String,
    pub departure_at: DateTime<Utc>,
    pub departure_clock: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentRecordedEvent {
    pub payment_record_id: Uuid,
    pub booking_id: Uuid,
    pub kind: String,
    pub status: String,
    pub amount: i64,
    pub timestamp: i64,
}

/// Everything the engine tells the outside world about. Delivery is best effort.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    Confirmed(BookingConfirmedEvent),
    Cancelled(BookingCancelledEvent),
    TripReminder(TripReminderEvent),
    PaymentRecorded(PaymentRecordedEvent),
}

impl BookingEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            BookingEvent::Confirmed(_) => TOPIC_BOOKING_CONFIRMED,
            BookingEvent::Cancelled(_) => TOPIC_BOOKING_CANCELLED,
            BookingEvent::TripReminder(_) => TOPIC_TRIP_REMINDER,
            BookingEvent::PaymentRecorded(_) => TOPIC_PAYMENT_RECORDED,
        }
    }

    /// Partition key: events for one booking stay ordered.
    pub fn key(&self) -> String {
        match self {
            BookingEvent::Confirmed(e) => e.booking_id.to_string(),
            BookingEvent::Cancelled(e) => e.booking_id.to_string(),
            BookingEvent::TripReminder(e) => e.booking_id.to_string(),
            BookingEvent::PaymentRecorded(e) => e.booking_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topic_and_tagged_payload() {
        let booking_id = Uuid::new_v4();
        let event = BookingEvent::Cancelled(BookingCancelledEvent {
            booking_id,
            booking_number: "WKD-2025-001".to_string(),
            trip_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            seats_released: 2,
            refund_amount: Some(4000),
            timestamp: 0,
        });

        assert_eq!(event.topic(), "booking.cancelled");
        assert_eq!(event.key(), booking_id.to_string());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cancelled");
        assert_eq!(json["refund_amount"], 4000);
    }

    #[test]
    fn test_lead_passenger_masked_in_debug() {
        let event = BookingConfirmedEvent {
            booking_id: Uuid::new_v4(),
            booking_number: "WKD-2025-002".to_string(),
            trip_id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            passenger_count: 1,
            lead_passenger: Masked::new("Gopal Verma".to_string()),
            seat_labels: vec!["S1".to_string()],
            total_amount: 2000,
            advance_amount: None,
            timestamp: 0,
        };

        let debug = format!("{:?}", event);
        assert!(!debug.contains("Gopal"));
    }
}
