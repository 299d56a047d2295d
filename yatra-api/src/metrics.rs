use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

/// Process-wide booking counters, rendered at `GET /metrics`.
pub struct Metrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub bookings_rejected: IntCounterVec,
    pub trips_generated: IntCounter,
    pub reminders_sent: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("yatra".to_string()), None)?;

        let bookings_created = IntCounter::new("bookings_created_total", "Bookings confirmed")?;
        let bookings_cancelled = IntCounter::new("bookings_cancelled_total", "Bookings cancelled")?;
        let bookings_rejected = IntCounterVec::new(
            Opts::new("bookings_rejected_total", "Booking requests refused, by reason"),
            &["reason"],
        )?;
        let trips_generated = IntCounter::new("trips_generated_total", "Trips created by the generator")?;
        let reminders_sent = IntCounter::new("trip_reminders_sent_total", "Trip reminder events published")?;

        registry.register(Box::new(bookings_created.clone()))?;
        registry.register(Box::new(bookings_cancelled.clone()))?;
        registry.register(Box::new(bookings_rejected.clone()))?;
        registry.register(Box::new(trips_generated.clone()))?;
        registry.register(Box::new(reminders_sent.clone()))?;

        Ok(Self {
            registry,
            bookings_created,
            bookings_cancelled,
            bookings_rejected,
            trips_generated,
            reminders_sent,
        })
    }

    pub fn reject(&self, reason: &str) {
        self.bookings_rejected.with_label_values(&[reason]).inc();
    }

    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| AppError::InternalServerError(e.to_string()))
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}
