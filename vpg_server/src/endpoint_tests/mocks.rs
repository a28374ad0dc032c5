use std::time::Duration;

use mockall::mock;
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
    ReconciliationError,
    ReconciliationManagement,
};

mock! {
    pub Store {}
    impl IdempotencyLedger for Store {
        async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError>;
        async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError>;
        async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError>;
    }
    impl InventoryManagement for Store {
        async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError>;
        async fn fetch_slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError>;
        async fn upsert_slot(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError>;
        async fn fetch_sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError>;
        async fn fetch_sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError>;
    }
    impl ReconciliationManagement for Store {
        async fn flag_for_reconciliation(&self, item: NewReconciliationItem) -> Result<ReconciliationItem, ReconciliationError>;
        async fn fetch_open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError>;
        async fn resolve_reconciliation_item(&self, id: i64, outcome: LedgerOutcome, note: &str) -> Result<ReconciliationItem, ReconciliationError>;
    }
}

/// Wraps a [`MockStore`] whose claims take `claim_delay` to start, as when another writer holds the database lock.
pub struct StalledStore {
    pub inner: MockStore,
    pub claim_delay: Duration,
}

impl IdempotencyLedger for StalledStore {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError> {
        actix_web::rt::time::sleep(self.claim_delay).await;
        self.inner.claim(key).await
    }

    async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        self.inner.settle(key, outcome).await
    }

    async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError> {
        self.inner.fetch_record(key).await
    }
}

impl InventoryManagement for StalledStore {
    async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError> {
        self.inner.fulfill(slot, sale).await
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

impl ReconciliationManagement for StalledStore {
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
