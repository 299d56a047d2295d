use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use yatra_booking::BookingError;
use yatra_schedule::GeneratorError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    GoneError(String),
    UnavailableError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::GoneError(msg) => (StatusCode::GONE, msg),
            AppError::UnavailableError(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err {
            BookingError::TripNotFound(_)
            | BookingError::BookingNotFound(_)
            | BookingError::PaymentRecordNotFound(_) => AppError::NotFoundError(msg),
            BookingError::TripInactive(_) => AppError::GoneError(msg),
            BookingError::InsufficientSeats { .. }
            | BookingError::AlreadyCancelled(_)
            | BookingError::CannotCancelCompleted(_)
            | BookingError::AlreadyFullyPaid(_)
            | BookingError::PaymentRecordFinalized(_) => AppError::ConflictError(msg),
            BookingError::InvalidRequest(_) => AppError::ValidationError(msg),
            BookingError::ConcurrentUpdateConflict(_) | BookingError::Timeout(_) => AppError::UnavailableError(msg),
            BookingError::InvariantViolation(_) | BookingError::Store(_) => AppError::InternalServerError(msg),
        }
    }
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::InvalidTour(msg) => AppError::InternalServerError(msg),
            GeneratorError::Store(e) => BookingError::from(e).into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_errors_map_to_status() {
        let cases = [
            (BookingError::TripNotFound("x".into()), StatusCode::NOT_FOUND),
            (BookingError::TripInactive("x".into()), StatusCode::GONE),
            (BookingError::InsufficientSeats { requested: 2, available: 1 }, StatusCode::CONFLICT),
            (BookingError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (BookingError::Timeout("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (BookingError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
