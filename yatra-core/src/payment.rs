use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::PaymentKind;

/// What the gateway needs to move money for one ledger record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInstruction {
    pub payment_record_id: Uuid,
    pub booking_id: Uuid,
    pub booking_number: String,
    pub amount: i64,
    pub method: String,
    pub kind: PaymentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayAck {
    /// Gateway took the instruction; the final outcome arrives by callback.
    Accepted { reference: String },
    /// Refused outright, the record can be marked FAILED.
    Rejected { reason: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<GatewayAck, Box<dyn std::error::Error + Send + Sync>>;
}

/// Accepts everything except the `fail-gateway` method
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn submit(
        &self,
        instruction: &PaymentInstruction,
    ) -> Result<GatewayAck, Box<dyn std::error::Error + Send + Sync>> {
        if instruction.method == "fail-gateway" {
            return Ok(GatewayAck::Rejected {
                reason: "Simulated gateway decline".to_string(),
            });
        }

        tracing::info!(
            "Mock gateway accepted {} of {} for booking {}",
            instruction.kind,
            instruction.amount,
            instruction.booking_number
        );

        Ok(GatewayAck::Accepted {
            reference: format!("mock_pay_{}", instruction.payment_record_id.simple()),
        })
    }
}
