use serde::{Deserialize, Serialize};

use crate::{
    db_types::{IdempotencyKey, LedgerOutcome, ReconciliationReason, SaleRecord},
    helpers::NotificationFields,
};

/// The gateway's status code for a successful payment.
pub const SUCCESS_STATUS: &str = "1";

/// An inbound payment notification, exactly as the gateway sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub fields: NotificationFields,
    pub signature: Option<String>,
    pub error_description: Option<String>,
}

impl PaymentNotification {
    pub fn new(fields: NotificationFields, signature: Option<String>) -> Self {
        Self { fields, signature, error_description: None }
    }

    pub fn with_error_description<S: Into<String>>(mut self, desc: S) -> Self {
        self.error_description = Some(desc.into());
        self
    }

    /// The idempotency key, if both halves are present.
    pub fn key(&self) -> Option<IdempotencyKey> {
        let txn_id = self.fields.transaction_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let reference = self.fields.reference.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(IdempotencyKey::new(txn_id, reference))
    }

    pub fn is_success(&self) -> bool {
        self.fields.status.as_deref().map(str::trim) == Some(SUCCESS_STATUS)
    }
}

/// What happened to a notification. Every variant except [`CallbackOutcome::Rejected`] means the notification was
/// authentic and should be acknowledged to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The signature did not verify. Nothing was written.
    Rejected,
    /// Authentic, but the gateway reports the payment did not succeed. Nothing was written.
    Acknowledged,
    /// Authentic and paid, but an earlier delivery already claimed it.
    AlreadyProcessed,
    /// Stock was released and the sale recorded.
    Fulfilled(SaleRecord),
    /// Authentic and paid, but could not be fulfilled. It has been queued for reconciliation.
    FulfillmentFailed { reason: ReconciliationReason },
}

impl CallbackOutcome {
    /// The ledger outcome this delivery corresponds to, for notifications that went through the ledger.
    pub fn ledger_outcome(&self) -> Option<LedgerOutcome> {
        match self {
            Self::Rejected | Self::Acknowledged => None,
            Self::AlreadyProcessed => Some(LedgerOutcome::Duplicate),
            Self::Fulfilled(_) => Some(LedgerOutcome::Fulfilled),
            Self::FulfillmentFailed { .. } => Some(LedgerOutcome::Rejected),
        }
    }

    pub fn is_authentic(&self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// An outbound payment request, ready to be posted to the gateway's payment page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPaymentRequest {
    pub merchant_code: String,
    pub reference: String,
    pub amount: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub signature: String,
}
