use thiserror::Error;

use crate::db_types::{LedgerOutcome, NewReconciliationItem, ReconciliationItem};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Reconciliation storage error: {0}")]
    DatabaseError(String),
    #[error("Reconciliation item {0} does not exist")]
    ItemNotFound(i64),
    #[error("Reconciliation item {0} has already been resolved")]
    AlreadyResolved(i64),
    #[error("{0} is not a valid resolution")]
    InvalidOutcome(LedgerOutcome),
}

impl From<sqlx::Error> for ReconciliationError {
    fn from(e: sqlx::Error) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

/// The manual reconciliation queue.
#[allow(async_fn_in_trait)]
pub trait ReconciliationManagement {
    /// Adds an item to the queue. There is at most one item per idempotency key; flagging a key that is already queued
    /// returns the existing item.
    async fn flag_for_reconciliation(
        &self,
        item: NewReconciliationItem,
    ) -> Result<ReconciliationItem, ReconciliationError>;

    /// All unresolved items, oldest first.
    async fn fetch_open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError>;

    /// Marks the item as resolved and overwrites the ledger outcome for its key, in one transaction. This is the only
    /// way a settled ledger outcome can change.
    async fn resolve_reconciliation_item(
        &self,
        id: i64,
        outcome: LedgerOutcome,
        note: &str,
    ) -> Result<ReconciliationItem, ReconciliationError>;
}
