use std::sync::Arc;
use uuid::Uuid;
use yatra_core::booking::{Booking, BookingStatus, PaymentKind, PaymentRecord, PaymentRecordStatus};
use yatra_core::repository::{BookingRepository, PaymentFilter, PaymentRepository};
use yatra_core::{GatewayAck, Notifier, PaymentGateway, PaymentInstruction, StoreError};

use crate::engine::payment_event;
use crate::error::BookingError;

/// Append-only record of money movements, and the gateway's way back in.
pub struct PaymentLedger {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
}

impl PaymentLedger {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            bookings,
            payments,
            gateway,
            notifier,
        }
    }

    pub async fn get(&self, record_id: Uuid) -> Result<PaymentRecord, BookingError> {
        self.payments
            .get_payment(record_id)
            .await?
            .ok_or_else(|| BookingError::PaymentRecordNotFound(record_id.to_string()))
    }

    /// Every record for one booking, oldest first.
    pub async fn history(&self, booking_id: Uuid) -> Result<Vec<PaymentRecord>, BookingError> {
        self.load_booking(booking_id).await?;
        let filter = PaymentFilter {
            booking_id: Some(booking_id),
            ..Default::default()
        };
        let mut records = self.payments.list_payments(&filter).await?;
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    /// Final outcome reported by the gateway. Only the record moves; the
    /// booking's payment status is left as it is.
    pub async fn record_outcome(
        &self,
        record_id: Uuid,
        outcome: PaymentRecordStatus,
    ) -> Result<PaymentRecord, BookingError> {
        if !outcome.is_final() {
            return Err(BookingError::InvalidRequest(format!(
                "outcome must be COMPLETED or FAILED, got {}",
                outcome
            )));
        }

        let record = self.get(record_id).await?;
        if record.status.is_final() {
            return Err(BookingError::PaymentRecordFinalized(record_id.to_string()));
        }

        let updated = self
            .payments
            .update_payment_status(record_id, record.status, outcome)
            .await
            .map_err(|e| match e {
                // Someone else settled it between our read and write.
                StoreError::Conflict(_) => BookingError::PaymentRecordFinalized(record_id.to_string()),
                other => other.into(),
            })?;

        tracing::info!("Payment record {} ({}) is now {}", updated.id, updated.kind, updated.status);
        self.publish(&updated).await;
        Ok(updated)
    }

    /// New PENDING attempt for a FAILED record, linked through `retry_of`.
    pub async fn retry(&self, record_id: Uuid) -> Result<PaymentRecord, BookingError> {
        let failed = self.get(record_id).await?;

        match failed.status {
            PaymentRecordStatus::Failed => {}
            PaymentRecordStatus::Completed => {
                return Err(BookingError::PaymentRecordFinalized(record_id.to_string()))
            }
            other => {
                return Err(BookingError::InvalidRequest(format!(
                    "only FAILED records can be retried, record is {}",
                    other
                )))
            }
        }

        let booking = self.load_booking(failed.booking_id).await?;
        if failed.kind != PaymentKind::Refund && booking.booking_status == BookingStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled(booking.booking_number));
        }

        let siblings = self
            .payments
            .list_payments(&PaymentFilter {
                booking_id: Some(failed.booking_id),
                ..Default::default()
            })
            .await?;
        if siblings.iter().any(|r| r.retry_of == Some(failed.id)) {
            return Err(BookingError::InvalidRequest(format!(
                "payment record {} was already retried",
                record_id
            )));
        }

        let attempt = failed.retry();
        self.payments.append_payment(&attempt).await.map_err(|e| match e {
            // A concurrent retry of the same record got there first.
            StoreError::Duplicate(_) => {
                BookingError::InvalidRequest(format!("payment record {} was already retried", record_id))
            }
            other => other.into(),
        })?;
        tracing::info!("Payment record {} retried as {}", failed.id, attempt.id);

        submit_to_gateway(self.gateway.as_ref(), self.payments.as_ref(), &booking, &attempt).await;
        self.publish(&attempt).await;
        Ok(attempt)
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<Booking, BookingError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))
    }

    async fn publish(&self, record: &PaymentRecord) {
        let event = payment_event(record);
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::error!("Failed to publish {} for {}: {}", event.topic(), event.key(), e);
        }
    }
}

/// Best effort hand-off. A decline marks the record FAILED so it can be
/// retried; an unreachable gateway leaves it untouched.
pub(crate) async fn submit_to_gateway(
    gateway: &dyn PaymentGateway,
    payments: &dyn PaymentRepository,
    booking: &Booking,
    record: &PaymentRecord,
) {
    let instruction = PaymentInstruction {
        payment_record_id: record.id,
        booking_id: booking.id,
        booking_number: booking.booking_number.clone(),
        amount: record.amount,
        method: record.method.clone(),
        kind: record.kind,
    };

    match gateway.submit(&instruction).await {
        Ok(GatewayAck::Accepted { reference }) => {
            tracing::info!("Gateway accepted {} {} ({})", record.kind, record.id, reference);
        }
        Ok(GatewayAck::Rejected { reason }) => {
            tracing::warn!("Gateway declined {} {}: {}", record.kind, record.id, reason);
            if let Err(e) = payments
                .update_payment_status(record.id, record.status, PaymentRecordStatus::Failed)
                .await
            {
                tracing::error!("Failed to mark payment record {} as failed: {}", record.id, e);
            }
        }
        Err(e) => {
            tracing::error!("Payment gateway unavailable for record {}: {}", record.id, e);
        }
    }
}
