use serde::{Deserialize, Serialize};

use crate::db_types::{IdempotencyKey, ReconciliationItem, SaleRecord};

/// Published after a sale has been committed and the ledger settled as `Fulfilled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFulfilledEvent {
    pub sale: SaleRecord,
}

impl SaleFulfilledEvent {
    pub fn new(sale: SaleRecord) -> Self {
        Self { sale }
    }
}

/// Published when an authentic, paid notification could not be fulfilled and was queued for a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequiredEvent {
    pub item: ReconciliationItem,
}

impl ReconciliationRequiredEvent {
    pub fn new(item: ReconciliationItem) -> Self {
        Self { item }
    }

    pub fn key(&self) -> IdempotencyKey {
        self.item.key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    SaleFulfilled(SaleFulfilledEvent),
    ReconciliationRequired(ReconciliationRequiredEvent),
}
