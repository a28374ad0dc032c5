use thiserror::Error;

use crate::{
    db_types::{IdempotencyKey, IdempotencyRecord, LedgerOutcome},
    traits::ClaimResult,
};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    DatabaseError(String),
    #[error("The key {0} has not been claimed")]
    NotClaimed(IdempotencyKey),
    #[error("The key {0} has already been settled")]
    AlreadySettled(IdempotencyKey),
    #[error("{0} is not a terminal outcome")]
    InvalidOutcome(LedgerOutcome),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The durable record of which gateway notifications have been processed.
///
/// Entries are permanent. Gateways retry notifications for hours, so there is no safe expiry window.
#[allow(async_fn_in_trait)]
pub trait IdempotencyLedger {
    /// Atomically claim the key.
    ///
    /// Implementations MUST perform the existence check and the insert as one operation (a uniqueness constraint, or
    /// an insert-if-absent under a single lock). Of any number of concurrent callers for the same key, exactly one
    /// receives [`ClaimResult::Claimed`]. Every other caller receives [`ClaimResult::AlreadyClaimed`], and the
    /// delivery count on the entry is incremented.
    async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError>;

    /// Record the terminal outcome for a claimed key. Outcomes are write-once: settling a key twice is an error, and
    /// `Duplicate` is never a valid settlement.
    async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError>;

    async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError>;
}
