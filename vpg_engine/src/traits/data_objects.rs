use crate::db_types::{IdempotencyRecord, SaleRecord};

/// The result of an [`IdempotencyLedger::claim`](super::IdempotencyLedger::claim) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// This caller created the ledger entry and owns the fulfilment for the key.
    Claimed(IdempotencyRecord),
    /// The key had already been claimed. The record reflects this delivery in its `deliveries` count.
    AlreadyClaimed(IdempotencyRecord),
}

impl ClaimResult {
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed(_))
    }

    pub fn record(&self) -> &IdempotencyRecord {
        match self {
            Self::Claimed(r) | Self::AlreadyClaimed(r) => r,
        }
    }
}

/// The result of an [`InventoryManagement::fulfill`](super::InventoryManagement::fulfill) call. Only `Fulfilled`
/// implies that anything was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentResult {
    Fulfilled(SaleRecord),
    InsufficientStock,
    UnknownTarget,
}
