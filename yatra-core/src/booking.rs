use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const BOOKING_NUMBER_PREFIX: &str = "WKD";

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Payment axis of a booking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    AdvancePaid,
    FullPaid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::AdvancePaid => "ADVANCE_PAID",
            PaymentStatus::FullPaid => "FULL_PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "ADVANCE_PAID" => Ok(PaymentStatus::AdvancePaid),
            "FULL_PAID" => Ok(PaymentStatus::FullPaid),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(UnknownVariant { kind: "payment status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation axis of a booking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(UnknownVariant { kind: "booking status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: Gender,
}

/// A customer's reservation against one trip
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub booking_number: String,
    pub user_id: String,
    pub trip_id: Uuid,
    pub passenger_count: i32,
    pub passengers: Vec<Passenger>,
    pub seat_labels: Vec<String>,
    pub total_amount: i64,
    pub advance_amount: Option<i64>,
    pub payment_status: PaymentStatus,
    pub booking_status: BookingStatus,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Confirmed and completed bookings count against the trip's seats.
    pub fn holds_seats(&self) -> bool {
        matches!(self.booking_status, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    pub fn money_collected(&self) -> bool {
        self.payment_status != PaymentStatus::Pending
    }

    /// What is left to pay after the advance
    pub fn balance_due(&self) -> i64 {
        self.total_amount - self.advance_amount.unwrap_or(0)
    }
}

/// A booking before the store has numbered it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDraft {
    pub id: Uuid,
    pub user_id: String,
    pub trip_id: Uuid,
    pub passengers: Vec<Passenger>,
    pub seat_labels: Vec<String>,
    pub total_amount: i64,
    pub advance_amount: Option<i64>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingDraft {
    pub fn passenger_count(&self) -> i32 {
        self.passengers.len() as i32
    }

    pub fn into_booking(self, sequence: i64) -> Booking {
        Booking {
            id: self.id,
            booking_number: format_booking_number(self.created_at.year(), sequence),
            user_id: self.user_id,
            trip_id: self.trip_id,
            passenger_count: self.passengers.len() as i32,
            passengers: self.passengers,
            seat_labels: self.seat_labels,
            total_amount: self.total_amount,
            advance_amount: self.advance_amount,
            payment_status: self.payment_status,
            booking_status: BookingStatus::Confirmed,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// `WKD-<year>-<sequence>`, sequence padded to three digits
pub fn format_booking_number(year: i32, sequence: i64) -> String {
    format!("{}-{}-{:03}", BOOKING_NUMBER_PREFIX, year, sequence)
}

pub fn parse_booking_number(number: &str) -> Option<(i32, i64)> {
    let mut parts = number.splitn(3, '-');
    if parts.next()? != BOOKING_NUMBER_PREFIX {
        return None;
    }
    let year = parts.next()?.parse().ok()?;
    let sequence = parts.next()?.parse().ok()?;
    Some((year, sequence))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    Advance,
    FullPayment,
    Refund,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Advance => "ADVANCE",
            PaymentKind::FullPayment => "FULL_PAYMENT",
            PaymentKind::Refund => "REFUND",
        }
    }
}

impl FromStr for PaymentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADVANCE" => Ok(PaymentKind::Advance),
            "FULL_PAYMENT" => Ok(PaymentKind::FullPayment),
            "REFUND" => Ok(PaymentKind::Refund),
            other => Err(UnknownVariant { kind: "payment kind", value: other.to_string() }),
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentRecordStatus {
    Pending,
    Completed,
    Processing,
    Failed,
}

impl PaymentRecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentRecordStatus::Pending => "PENDING",
            PaymentRecordStatus::Completed => "COMPLETED",
            PaymentRecordStatus::Processing => "PROCESSING",
            PaymentRecordStatus::Failed => "FAILED",
        }
    }

    /// Settled records never change again.
    pub fn is_final(&self) -> bool {
        matches!(self, PaymentRecordStatus::Completed | PaymentRecordStatus::Failed)
    }
}

impl FromStr for PaymentRecordStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentRecordStatus::Pending),
            "COMPLETED" => Ok(PaymentRecordStatus::Completed),
            "PROCESSING" => Ok(PaymentRecordStatus::Processing),
            "FAILED" => Ok(PaymentRecordStatus::Failed),
            other => Err(UnknownVariant { kind: "payment record status", value: other.to_string() }),
        }
    }
}

impl fmt::Display for PaymentRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One money movement on a booking. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub kind: PaymentKind,
    pub status: PaymentRecordStatus,
    pub method: String,
    pub retry_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(
        booking_id: Uuid,
        amount: i64,
        kind: PaymentKind,
        status: PaymentRecordStatus,
        method: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            kind,
            status,
            method: method.into(),
            retry_of: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fresh PENDING attempt for the same money movement
    pub fn retry(&self) -> Self {
        let mut record = Self::new(
            self.booking_id,
            self.amount,
            self.kind,
            PaymentRecordStatus::Pending,
            self.method.clone(),
        );
        record.retry_of = Some(self.id);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_booking_number_format() {
        assert_eq!(format_booking_number(2025, 7), "WKD-2025-007");
        assert_eq!(format_booking_number(2025, 1234), "WKD-2025-1234");
        assert_eq!(parse_booking_number("WKD-2025-007"), Some((2025, 7)));
        assert_eq!(parse_booking_number("ABC-2025-007"), None);
        assert_eq!(parse_booking_number("WKD-2025"), None);
    }

    #[test]
    fn test_draft_numbering_uses_creation_year() {
        let draft = BookingDraft {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            trip_id: Uuid::new_v4(),
            passengers: vec![Passenger { name: "Meera".to_string(), age: 34, gender: Gender::Female }],
            seat_labels: vec!["S1".to_string()],
            total_amount: 2000,
            advance_amount: None,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
        };

        let booking = draft.into_booking(7);
        assert_eq!(booking.booking_number, "WKD-2025-007");
        assert_eq!(booking.passenger_count, 1);
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert!(booking.holds_seats());
        assert!(!booking.money_collected());
        assert_eq!(booking.balance_due(), 2000);
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::AdvancePaid,
            PaymentStatus::FullPaid,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("PAID".parse::<PaymentStatus>().is_err());
        assert_eq!(
            serde_json::to_value(PaymentKind::FullPayment).unwrap(),
            serde_json::json!("FULL_PAYMENT")
        );
    }

    #[test]
    fn test_retry_links_to_failed_record() {
        let failed = PaymentRecord::new(
            Uuid::new_v4(),
            500,
            PaymentKind::Advance,
            PaymentRecordStatus::Failed,
            "UPI",
        );
        let retry = failed.retry();
        assert_eq!(retry.retry_of, Some(failed.id));
        assert_eq!(retry.status, PaymentRecordStatus::Pending);
        assert_eq!(retry.amount, 500);
        assert_ne!(retry.id, failed.id);
    }
}
