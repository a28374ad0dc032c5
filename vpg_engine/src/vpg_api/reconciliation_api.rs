use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{LedgerOutcome, ReconciliationItem},
    traits::{ReconciliationError, ReconciliationManagement},
};

/// `ReconciliationApi` is the operator's view of payments that were authentic but could not be fulfilled.
pub struct ReconciliationApi<B> {
    db: B,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B> ReconciliationApi<B>
where B: ReconciliationManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Unresolved items, oldest first.
    pub async fn open_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        self.db.fetch_open_reconciliation_items().await
    }

    /// Closes an item and records the operator's verdict against its ledger entry. `Fulfilled` means the customer
    /// was served by hand; `Rejected` means the payment was refunded.
    pub async fn resolve(
        &self,
        id: i64,
        outcome: LedgerOutcome,
        note: &str,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        let item = self.db.resolve_reconciliation_item(id, outcome, note).await?;
        debug!("🧮️ Reconciliation #{id} closed with note '{note}'");
        Ok(item)
    }
}
