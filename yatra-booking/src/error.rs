use yatra_catalog::InventoryError;
use yatra_core::StoreError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Payment record not found: {0}")]
    PaymentRecordNotFound(String),

    #[error("Trip is not open for booking: {0}")]
    TripInactive(String),

    #[error("Insufficient seats: requested {requested}, available {available}")]
    InsufficientSeats {
        requested: i32,
        available: i32,
    },

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(String),

    #[error("Booking {0} is completed and cannot be cancelled")]
    CannotCancelCompleted(String),

    #[error("Booking {0} is already fully paid")]
    AlreadyFullyPaid(String),

    #[error("Payment record {0} is already settled")]
    PaymentRecordFinalized(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Concurrent update conflict: {0}")]
    ConcurrentUpdateConflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Inventory invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl BookingError {
    /// Transient failures a caller may try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::ConcurrentUpdateConflict(_) | BookingError::Timeout(_) | BookingError::Store(_)
        )
    }

    /// Short stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::TripNotFound(_) => "trip_not_found",
            BookingError::BookingNotFound(_) => "booking_not_found",
            BookingError::PaymentRecordNotFound(_) => "payment_record_not_found",
            BookingError::TripInactive(_) => "trip_inactive",
            BookingError::InsufficientSeats { .. } => "insufficient_seats",
            BookingError::AlreadyCancelled(_) => "already_cancelled",
            BookingError::CannotCancelCompleted(_) => "cannot_cancel_completed",
            BookingError::AlreadyFullyPaid(_) => "already_fully_paid",
            BookingError::PaymentRecordFinalized(_) => "payment_record_finalized",
            BookingError::InvalidRequest(_) => "invalid_request",
            BookingError::ConcurrentUpdateConflict(_) => "conflict",
            BookingError::Timeout(_) => "timeout",
            BookingError::InvariantViolation(_) => "invariant_violation",
            BookingError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => BookingError::ConcurrentUpdateConflict(msg),
            StoreError::InsufficientSeats { requested, available } => {
                BookingError::InsufficientSeats { requested, available }
            }
            StoreError::SeatsExceedCapacity { resulting, total } => {
                tracing::error!("Seat count {} would exceed capacity {}", resulting, total);
                BookingError::InvariantViolation(format!(
                    "seat count {} would exceed capacity {}",
                    resulting, total
                ))
            }
            StoreError::Invalid(msg) => BookingError::InvalidRequest(msg),
            other => BookingError::Store(other.to_string()),
        }
    }
}

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(id) => BookingError::TripNotFound(id),
            InventoryError::Inactive(id) => BookingError::TripInactive(id),
            InventoryError::InvalidTrip(msg) => BookingError::InvalidRequest(msg),
            other => StoreError::from(other).into(),
        }
    }
}
