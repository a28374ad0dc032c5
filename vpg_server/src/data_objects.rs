use serde::{Deserialize, Serialize};
use vpg_engine::{db_types::LedgerOutcome, helpers::NotificationFields, PaymentNotification};

/// The form the gateway posts to the callback URL. Every field is optional so that a short form reaches signature
/// verification (and fails it) instead of failing extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayCallbackForm {
    #[serde(rename = "MerchantCode")]
    pub merchant_code: Option<String>,
    #[serde(rename = "PaymentId")]
    pub payment_id: Option<String>,
    #[serde(rename = "RefNo")]
    pub ref_no: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<String>,
    #[serde(rename = "Currency")]
    pub currency: Option<String>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Sig")]
    pub signature: Option<String>,
    #[serde(rename = "ErrorDesc")]
    pub error_description: Option<String>,
}

impl From<GatewayCallbackForm> for PaymentNotification {
    fn from(form: GatewayCallbackForm) -> Self {
        let fields = NotificationFields {
            merchant_code: form.merchant_code,
            transaction_id: form.payment_id,
            reference: form.ref_no,
            amount: form.amount,
            currency: form.currency,
            status: form.status,
        };
        PaymentNotification { fields, signature: form.signature, error_description: form.error_description }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequestParams {
    pub slot_id: String,
    /// A decimal amount in major units, e.g. `"4.50"`.
    pub amount: String,
    pub currency: Option<String>,
    pub extension: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveReconciliationParams {
    pub outcome: LedgerOutcome,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotStockParams {
    pub stock: i64,
    pub capacity: i64,
}
