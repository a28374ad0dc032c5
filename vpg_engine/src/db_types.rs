use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use vpg_common::Amount;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        SlotId         ---------------------------------------------------------
/// The fulfilment target carried inside a merchant reference, e.g. `SLOT07`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl SlotId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SlotId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SlotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

//--------------------------------------    IdempotencyKey     ---------------------------------------------------------
/// The key under which a gateway notification is claimed: the gateway's own transaction id plus our merchant reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    pub gateway_txn_id: String,
    pub reference: String,
}

impl IdempotencyKey {
    pub fn new<S1: Into<String>, S2: Into<String>>(gateway_txn_id: S1, reference: S2) -> Self {
        Self { gateway_txn_id: gateway_txn_id.into(), reference: reference.into() }
    }
}

impl Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.gateway_txn_id, self.reference)
    }
}

//--------------------------------------     LedgerOutcome     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LedgerOutcome {
    /// The claimed notification released stock and a sale was recorded.
    Fulfilled,
    /// The claimed notification was authentic but could not be fulfilled. It needs manual reconciliation.
    Rejected,
    /// The notification had already been claimed by an earlier delivery. This is never stored against a key.
    Duplicate,
}

impl Display for LedgerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerOutcome::Fulfilled => write!(f, "Fulfilled"),
            LedgerOutcome::Rejected => write!(f, "Rejected"),
            LedgerOutcome::Duplicate => write!(f, "Duplicate"),
        }
    }
}

impl FromStr for LedgerOutcome {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Fulfilled" => Ok(Self::Fulfilled),
            "Rejected" => Ok(Self::Rejected),
            "Duplicate" => Ok(Self::Duplicate),
            s => Err(ConversionError(format!("Invalid ledger outcome: {s}"))),
        }
    }
}

//--------------------------------------   IdempotencyRecord   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub gateway_txn_id: String,
    pub reference: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// The number of times this key has been delivered, including the claiming delivery.
    pub deliveries: i64,
    /// `None` while the claiming delivery is still in flight (or crashed before it could settle).
    pub outcome: Option<LedgerOutcome>,
}

impl IdempotencyRecord {
    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.gateway_txn_id.clone(), self.reference.clone())
    }
}

//--------------------------------------     InventorySlot     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventorySlot {
    pub id: SlotId,
    pub current_stock: i64,
    pub capacity: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewSale        ---------------------------------------------------------
/// The sale details that accompany a fulfilment request. The slot is supplied separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub reference: String,
    pub gateway_txn_id: String,
    pub amount: Amount,
    pub currency: String,
}

impl NewSale {
    pub fn new(key: &IdempotencyKey, amount: Amount, currency: &str) -> Self {
        Self {
            reference: key.reference.clone(),
            gateway_txn_id: key.gateway_txn_id.clone(),
            amount,
            currency: currency.to_string(),
        }
    }
}

//--------------------------------------      SaleRecord       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: i64,
    pub reference: String,
    pub gateway_txn_id: String,
    pub slot_id: SlotId,
    pub amount: Amount,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  ReconciliationReason ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ReconciliationReason {
    /// The reference did not decode to a fulfilment target.
    MalformedReference,
    /// The amount could not be represented as a currency value.
    MalformedAmount,
    /// The reference decoded, but no such slot exists.
    UnknownTarget,
    /// The slot was empty when the payment arrived.
    InsufficientStock,
    /// A store failure or timeout stopped processing after the claim, and no sale was found for the key.
    Interrupted,
}

impl Display for ReconciliationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedReference => write!(f, "MalformedReference"),
            Self::MalformedAmount => write!(f, "MalformedAmount"),
            Self::UnknownTarget => write!(f, "UnknownTarget"),
            Self::InsufficientStock => write!(f, "InsufficientStock"),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl FromStr for ReconciliationReason {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MalformedReference" => Ok(Self::MalformedReference),
            "MalformedAmount" => Ok(Self::MalformedAmount),
            "UnknownTarget" => Ok(Self::UnknownTarget),
            "InsufficientStock" => Ok(Self::InsufficientStock),
            "Interrupted" => Ok(Self::Interrupted),
            s => Err(ConversionError(format!("Invalid reconciliation reason: {s}"))),
        }
    }
}

//-------------------------------------- NewReconciliationItem ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReconciliationItem {
    pub key: IdempotencyKey,
    pub reason: ReconciliationReason,
    pub detail: String,
}

impl NewReconciliationItem {
    pub fn new<S: Into<String>>(key: IdempotencyKey, reason: ReconciliationReason, detail: S) -> Self {
        Self { key, reason, detail: detail.into() }
    }
}

//--------------------------------------  ReconciliationItem   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub id: i64,
    pub gateway_txn_id: String,
    pub reference: String,
    pub reason: ReconciliationReason,
    pub detail: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_note: Option<String>,
}

impl ReconciliationItem {
    pub fn key(&self) -> IdempotencyKey {
        IdempotencyKey::new(self.gateway_txn_id.clone(), self.reference.clone())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}
