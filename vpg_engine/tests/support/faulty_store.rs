use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use vpg_engine::{
    db_types::{
        IdempotencyKey,
        IdempotencyRecord,
        InventorySlot,
        LedgerOutcome,
        NewReconciliationItem,
        NewSale,
        ReconciliationItem,
        SaleRecord,
        SlotId,
    },
    ClaimResult,
    FulfillmentResult,
    IdempotencyLedger,
    InventoryError,
    InventoryManagement,
    LedgerError,
    MemoryDatabase,
    ReconciliationError,
    ReconciliationManagement,
};

/// How the next `fulfill` calls misbehave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfilFault {
    /// Fails without touching the store.
    Fail,
    /// Writes the sale, then reports a failure, as when the connection drops before the commit is acknowledged.
    CommitThenFail,
}

/// A `MemoryDatabase` that can be told to stall or fail.
#[derive(Debug, Clone)]
pub struct FaultyStore {
    inner: MemoryDatabase,
    fault: FulfilFault,
    failing_fulfils: Arc<AtomicUsize>,
    claim_delay: Option<Duration>,
    fulfil_delay: Option<Duration>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryDatabase::new(),
            fault: FulfilFault::Fail,
            failing_fulfils: Arc::new(AtomicUsize::new(0)),
            claim_delay: None,
            fulfil_delay: None,
        }
    }

    /// The next `count` fulfilments misbehave as `fault`.
    pub fn failing_fulfils(mut self, fault: FulfilFault, count: usize) -> Self {
        self.fault = fault;
        self.failing_fulfils.store(count, Ordering::SeqCst);
        self
    }

    pub fn slow_claims(mut self, delay: Duration) -> Self {
        self.claim_delay = Some(delay);
        self
    }

    pub fn slow_fulfils(mut self, delay: Duration) -> Self {
        self.fulfil_delay = Some(delay);
        self
    }

    fn take_fault(&self) -> bool {
        self.failing_fulfils.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

impl IdempotencyLedger for FaultyStore {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError> {
        if let Some(delay) = self.claim_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.claim(key).await
    }

    async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        self.inner.settle(key, outcome).await
    }

    async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError> {
        self.inner.fetch_record(key).await
    }
}

impl InventoryManagement for FaultyStore {
    async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError> {
        if let Some(delay) = self.fulfil_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.take_fault() {
            return self.inner.fulfill(slot, sale).await;
        }
        if self.fault == FulfilFault::CommitThenFail {
            self.inner.fulfill(slot, sale).await?;
        }
        Err(InventoryError::DatabaseError("database is locked".into()))
    }

    async fn fetch_slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError> {
        self.inner.fetch_slot(slot).await
    }

    async fn upsert_slot(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError> {
        self.inner.upsert_slot(slot, stock, capacity).await
    }

    async fn fetch_sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError> {
        self.inner.fetch_sales_for_reference(reference).await
    }

    async fn fetch_sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError> {
        self.inner.fetch_sales_for_slot(slot).await
    }
}

impl ReconciliationManagement for FaultyStore {
    async fn flag_for_reconciliation(
        &self,
        item: NewReconciliationItem,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        self.inner.flag_for_reconciliation(item).await
    }

    async fn fetch_open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        self.inner.fetch_open_reconciliation_items().await
    }

    async fn resolve_reconciliation_item(
        &self,
        id: i64,
        outcome: LedgerOutcome,
        note: &str,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        self.inner.resolve_reconciliation_item(id, outcome, note).await
    }
}
