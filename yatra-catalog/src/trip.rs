use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Trip lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Upcoming,
    Full,
    Cancelled,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Upcoming => "UPCOMING",
            TripStatus::Full => "FULL",
            TripStatus::Cancelled => "CANCELLED",
            TripStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPCOMING" => Ok(TripStatus::Upcoming),
            "FULL" => Ok(TripStatus::Full),
            "CANCELLED" => Ok(TripStatus::Cancelled),
            "COMPLETED" => Ok(TripStatus::Completed),
            other => Err(InventoryError::InvalidTrip(format!("unknown trip status {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardingPoint {
    pub name: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
}

/// Display-only itinerary details. Parsed once when the trip is read and
/// never touched by the booking engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TripDetails {
    pub boarding_points: Vec<BoardingPoint>,
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
    pub cancellation_policy: Vec<String>,
}

/// One scheduled bus departure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: String,
    pub destination_id: String,
    pub title: String,
    pub description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
    pub departure_clock: String,
    pub return_clock: String,
    pub total_seats: i32,
    pub available_seats: i32,
    pub price_per_seat: i64,
    pub advance_price: Option<i64>,
    pub status: TripStatus,
    pub details: TripDetails,
    pub is_active: bool,
    /// Set on generated trips; `(weekend_date, tour_type)` is unique.
    pub tour_type: Option<String>,
    pub weekend_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Seats held by confirmed or completed bookings
    pub fn booked_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    pub fn has_bookings(&self) -> bool {
        self.booked_seats() > 0
    }

    /// Only active trips that have not been cancelled or completed take bookings.
    pub fn is_bookable(&self) -> bool {
        self.is_active && matches!(self.status, TripStatus::Upcoming | TripStatus::Full)
    }

    /// Seat count after applying `delta`, without mutating the trip.
    pub fn seats_after(&self, delta: i32) -> Result<i32, InventoryError> {
        // available_seats is never negative, so only the upper end can wrap.
        let Some(resulting) = self.available_seats.checked_add(delta) else {
            return Err(InventoryError::SeatsExceedCapacity {
                resulting: i32::MAX,
                total: self.total_seats,
            });
        };

        if resulting < 0 {
            return Err(InventoryError::InsufficientSeats {
                requested: delta.checked_neg().unwrap_or(i32::MAX),
                available: self.available_seats,
            });
        }

        if resulting > self.total_seats {
            return Err(InventoryError::SeatsExceedCapacity {
                resulting,
                total: self.total_seats,
            });
        }

        Ok(resulting)
    }

    /// Apply a seat delta (negative books, positive releases) and keep the
    /// FULL status in step with the counter.
    pub fn apply_seat_delta(&mut self, delta: i32) -> Result<(), InventoryError> {
        let resulting = self.seats_after(delta)?;
        self.available_seats = resulting;
        self.status = status_for_seats(self.status, resulting);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Share of seats sold, 0.0 to 1.0
    pub fn occupancy(&self) -> f64 {
        if self.total_seats == 0 {
            0.0
        } else {
            1.0 - (self.available_seats as f64 / self.total_seats as f64)
        }
    }
}

/// FULL ⇔ no seats left, for trips still open for sale. Cancelled and
/// completed trips keep their status.
pub fn status_for_seats(current: TripStatus, available_seats: i32) -> TripStatus {
    match current {
        TripStatus::Upcoming if available_seats == 0 => TripStatus::Full,
        TripStatus::Full if available_seats > 0 => TripStatus::Upcoming,
        other => other,
    }
}

/// Input for creating a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDraft {
    pub route_id: String,
    pub destination_id: String,
    pub title: String,
    pub description: Option<String>,
    pub departure_at: DateTime<Utc>,
    pub return_at: DateTime<Utc>,
    pub departure_clock: String,
    pub return_clock: String,
    pub total_seats: i32,
    pub price_per_seat: i64,
    pub advance_price: Option<i64>,
    #[serde(default)]
    pub details: TripDetails,
    #[serde(default)]
    pub tour_type: Option<String>,
    #[serde(default)]
    pub weekend_date: Option<NaiveDate>,
}

impl TripDraft {
    pub fn validate(&self) -> Result<(), InventoryError> {
        if self.total_seats <= 0 {
            return Err(InventoryError::InvalidTrip(format!(
                "total_seats must be positive, got {}",
                self.total_seats
            )));
        }
        if self.price_per_seat <= 0 {
            return Err(InventoryError::InvalidTrip("price_per_seat must be positive".to_string()));
        }
        if let Some(advance) = self.advance_price {
            if advance < 0 || advance > self.price_per_seat {
                return Err(InventoryError::InvalidTrip(format!(
                    "advance_price {} must be between 0 and price_per_seat {}",
                    advance, self.price_per_seat
                )));
            }
        }
        if self.return_at < self.departure_at {
            return Err(InventoryError::InvalidTrip("return_at precedes departure_at".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(InventoryError::InvalidTrip("title is required".to_string()));
        }
        Ok(())
    }

    /// Materialize the trip with every seat available.
    pub fn into_trip(self) -> Result<Trip, InventoryError> {
        self.validate()?;
        let now = Utc::now();

        Ok(Trip {
            id: Uuid::new_v4(),
            route_id: self.route_id,
            destination_id: self.destination_id,
            title: self.title,
            description: self.description,
            departure_at: self.departure_at,
            return_at: self.return_at,
            departure_clock: self.departure_clock,
            return_clock: self.return_clock,
            total_seats: self.total_seats,
            available_seats: self.total_seats,
            price_per_seat: self.price_per_seat,
            advance_price: self.advance_price,
            status: TripStatus::Upcoming,
            details: self.details,
            is_active: true,
            tour_type: self.tour_type,
            weekend_date: self.weekend_date,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InventoryError {
    #[error("Trip not found: {0}")]
    NotFound(String),

    #[error("Trip is not open for booking: {0}")]
    Inactive(String),

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

    #[error("Invalid trip: {0}")]
    InvalidTrip(String),
}
