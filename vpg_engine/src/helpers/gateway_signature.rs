//! Gateway message authentication.
//!
//! The gateway and the merchant share a secret key. Every notification the gateway sends carries a `Sig` field: a
//! hex-encoded HMAC-SHA512, keyed by the shared secret, over a canonical concatenation of the notification fields:
//!
//! ```text
//! secret + merchant_code + transaction_id + reference + normalized_amount + currency + status
//! ```
//!
//! Outbound payment requests are signed the same way, without the transaction id and status, and with an optional
//! extension field appended:
//!
//! ```text
//! secret + merchant_code + reference + normalized_amount + currency [+ extension]
//! ```
//!
//! The amount is normalized by removing decimal points and thousands separators, so `"1,278.99"` becomes `"127899"`.
use std::fmt::Debug;

use hmac::{Hmac, Mac};
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use thiserror::Error;
use vpg_common::Secret;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The field '{0}' is required for signing, but was not provided.")]
    MissingField(&'static str),
    #[error("The amount '{0}' cannot be normalized for signing.")]
    InvalidAmount(String),
    #[error("The signing key could not be used. {0}")]
    InvalidKey(String),
}

/// The subset of an inbound notification that is covered by the gateway signature.
///
/// All fields are optional since they come straight off the wire. A missing field makes the notification
/// unverifiable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFields {
    pub merchant_code: Option<String>,
    pub transaction_id: Option<String>,
    pub reference: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub status: Option<String>,
}

impl NotificationFields {
    pub fn new(
        merchant_code: &str,
        transaction_id: &str,
        reference: &str,
        amount: &str,
        currency: &str,
        status: &str,
    ) -> Self {
        Self {
            merchant_code: Some(merchant_code.to_string()),
            transaction_id: Some(transaction_id.to_string()),
            reference: Some(reference.to_string()),
            amount: Some(amount.to_string()),
            currency: Some(currency.to_string()),
            status: Some(status.to_string()),
        }
    }
}

/// The fields of an outbound payment request. The merchant code is taken from the verifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequestFields {
    pub reference: String,
    pub amount: String,
    pub currency: String,
    pub extension: Option<String>,
}

/// Strips decimal points and thousands separators from a gateway amount. The result must be a non-empty string of
/// ASCII digits.
pub fn normalize_amount(amount: &str) -> Result<String, SignatureError> {
    let digits = amount.trim().chars().filter(|c| *c != '.' && *c != ',').collect::<String>();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SignatureError::InvalidAmount(amount.to_string()));
    }
    Ok(digits)
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, SignatureError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SignatureError::MissingField(name)),
    }
}

/// Signs and verifies gateway messages with the merchant's shared secret.
///
/// The secret is fixed for the life of the verifier. To rotate it, build a new verifier from the reloaded
/// configuration.
#[derive(Clone)]
pub struct SignatureVerifier {
    merchant_code: String,
    secret: Secret<String>,
}

impl Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureVerifier({}, {})", self.merchant_code, self.secret)
    }
}

impl SignatureVerifier {
    pub fn new(merchant_code: &str, secret: Secret<String>) -> Self {
        if secret.is_empty() {
            warn!("🔐️ The gateway signing secret is empty. Every notification will fail verification.");
        }
        Self { merchant_code: merchant_code.to_string(), secret }
    }

    pub fn merchant_code(&self) -> &str {
        self.merchant_code.as_str()
    }

    /// Checks the signature on an inbound notification.
    ///
    /// Returns false if any covered field is missing, if the merchant code is not ours, if the signature is not valid
    /// hex, or if the digest does not match. The digest comparison is constant-time.
    pub fn verify(&self, fields: &NotificationFields, provided_signature: &str) -> bool {
        if self.secret.is_empty() {
            return false;
        }
        let payload = match self.notification_payload(fields) {
            Ok(p) => p,
            Err(e) => {
                trace!("🔐️ Notification cannot be canonicalized. {e}");
                return false;
            },
        };
        if required(&fields.merchant_code, "MerchantCode").ok() != Some(self.merchant_code.as_str()) {
            trace!("🔐️ Notification is addressed to a different merchant code");
            return false;
        }
        let Ok(provided) = hex::decode(provided_signature.trim()) else {
            trace!("🔐️ Provided signature is not valid hex");
            return false;
        };
        match self.mac(&payload) {
            Ok(mac) => mac.verify_slice(&provided).is_ok(),
            Err(e) => {
                warn!("🔐️ {e}");
                false
            },
        }
    }

    /// Produces the signature the gateway would attach to a notification with these fields.
    pub fn sign(&self, fields: &NotificationFields) -> Result<String, SignatureError> {
        let payload = self.notification_payload(fields)?;
        let mac = self.mac(&payload)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Signs an outbound payment request.
    pub fn sign_request(&self, request: &PaymentRequestFields) -> Result<String, SignatureError> {
        let amount = normalize_amount(&request.amount)?;
        let mut payload = format!(
            "{}{}{}{}{}",
            self.secret.reveal(),
            self.merchant_code,
            request.reference,
            amount,
            request.currency
        );
        if let Some(ext) = &request.extension {
            payload.push_str(ext);
        }
        let mac = self.mac(&payload)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn notification_payload(&self, fields: &NotificationFields) -> Result<String, SignatureError> {
        let merchant = required(&fields.merchant_code, "MerchantCode")?;
        let txn_id = required(&fields.transaction_id, "PaymentId")?;
        let reference = required(&fields.reference, "RefNo")?;
        let amount = normalize_amount(required(&fields.amount, "Amount")?)?;
        let currency = required(&fields.currency, "Currency")?;
        let status = required(&fields.status, "Status")?;
        Ok(format!("{}{merchant}{txn_id}{reference}{amount}{currency}{status}", self.secret.reveal()))
    }

    fn mac(&self, payload: &str) -> Result<HmacSha512, SignatureError> {
        let mut mac = HmacSha512::new_from_slice(self.secret.reveal().as_bytes())
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
