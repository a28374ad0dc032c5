use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Amount, SlotId},
    helpers::{encode_reference, PaymentRequestFields, SignatureVerifier},
    traits::InventoryManagement,
    vpg_api::{callback_objects::SignedPaymentRequest, errors::PaymentRequestError},
};

/// Builds the signed form a kiosk posts to the gateway's payment page.
///
/// The reference encodes the slot so that the later notification can be fulfilled without any other lookup.
pub struct PaymentRequestApi<B> {
    db: B,
    verifier: SignatureVerifier,
    default_currency: String,
}

impl<B> Debug for PaymentRequestApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentRequestApi({:?}, {})", self.verifier, self.default_currency)
    }
}

impl<B> PaymentRequestApi<B>
where B: InventoryManagement
{
    pub fn new(db: B, verifier: SignatureVerifier, default_currency: &str) -> Self {
        Self { db, verifier, default_currency: default_currency.to_string() }
    }

    pub async fn new_request(
        &self,
        slot: &SlotId,
        amount: Amount,
        currency: Option<String>,
        extension: Option<String>,
    ) -> Result<SignedPaymentRequest, PaymentRequestError> {
        self.new_request_at(slot, amount, currency, extension, Utc::now().timestamp()).await
    }

    /// As [`Self::new_request`], with an explicit reference timestamp.
    pub async fn new_request_at(
        &self,
        slot: &SlotId,
        amount: Amount,
        currency: Option<String>,
        extension: Option<String>,
        timestamp: i64,
    ) -> Result<SignedPaymentRequest, PaymentRequestError> {
        if amount.value() <= 0 {
            return Err(PaymentRequestError::InvalidAmount);
        }
        let reference = encode_reference(slot, timestamp)?;
        let state = self.db.fetch_slot(slot).await?.ok_or_else(|| PaymentRequestError::UnknownTarget(slot.clone()))?;
        if state.current_stock <= 0 {
            return Err(PaymentRequestError::OutOfStock(slot.clone()));
        }
        let fields = PaymentRequestFields {
            reference,
            amount: amount.to_gateway_string(),
            currency: currency.unwrap_or_else(|| self.default_currency.clone()),
            extension,
        };
        let signature = self.verifier.sign_request(&fields)?;
        debug!("🧾️ Payment request {} for {} {} signed", fields.reference, fields.amount, fields.currency);
        Ok(SignedPaymentRequest {
            merchant_code: self.verifier.merchant_code().to_string(),
            reference: fields.reference,
            amount: fields.amount,
            currency: fields.currency,
            extension: fields.extension,
            signature,
        })
    }
}
