//! `SqliteDatabase` is a concrete implementation of a callback processor backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, inventory, ledger, new_pool, reconciliation};
use crate::{
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
    traits::{
        ClaimResult,
        FulfillmentResult,
        IdempotencyLedger,
        InventoryError,
        InventoryManagement,
        LedgerError,
        ReconciliationError,
        ReconciliationManagement,
        validate_stock,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl IdempotencyLedger for SqliteDatabase {
    async fn claim(&self, key: &IdempotencyKey) -> Result<ClaimResult, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = ledger::claim(key, &mut tx).await?;
        tx.commit().await?;
        match &result {
            ClaimResult::Claimed(_) => debug!("🗃️ Ledger key {key} claimed"),
            ClaimResult::AlreadyClaimed(r) => debug!("🗃️ Ledger key {key} was already claimed ({} deliveries)", r.deliveries),
        }
        Ok(result)
    }

    async fn settle(&self, key: &IdempotencyKey, outcome: LedgerOutcome) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;
        ledger::settle(key, outcome, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Ledger key {key} settled as {outcome}");
        Ok(())
    }

    async fn fetch_record(&self, key: &IdempotencyKey) -> Result<Option<IdempotencyRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        ledger::fetch_record(key, &mut conn).await
    }
}

impl InventoryManagement for SqliteDatabase {
    /// In a single atomic transaction,
    /// * takes one unit from the slot, provided the stock is positive,
    /// * inserts the sale record.
    ///
    /// If the slot is empty or missing, the transaction is rolled back and nothing is written.
    async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError> {
        let mut tx = self.pool.begin().await?;
        match inventory::try_decrement_stock(slot, &mut tx).await? {
            Some(remaining) => {
                let record = inventory::insert_sale(slot, sale, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Sale #{} for {} recorded against slot {slot}. {remaining} left.", record.id, record.reference);
                Ok(FulfillmentResult::Fulfilled(record))
            },
            None => {
                let existing = inventory::fetch_slot(slot, &mut tx).await?;
                tx.rollback().await?;
                match existing {
                    Some(_) => {
                        debug!("🗃️ Slot {slot} is out of stock");
                        Ok(FulfillmentResult::InsufficientStock)
                    },
                    None => {
                        debug!("🗃️ Slot {slot} does not exist");
                        Ok(FulfillmentResult::UnknownTarget)
                    },
                }
            },
        }
    }

    async fn fetch_slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_slot(slot, &mut conn).await
    }

    async fn upsert_slot(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError> {
        validate_stock(stock, capacity)?;
        let mut tx = self.pool.begin().await?;
        let result = inventory::upsert_slot(slot, stock, capacity, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Slot {slot} set to {stock}/{capacity}");
        Ok(result)
    }

    async fn fetch_sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_sales_for_reference(reference, &mut conn).await
    }

    async fn fetch_sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_sales_for_slot(slot, &mut conn).await
    }
}

impl ReconciliationManagement for SqliteDatabase {
    async fn flag_for_reconciliation(
        &self,
        item: NewReconciliationItem,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        let mut tx = self.pool.begin().await?;
        let item = reconciliation::idempotent_insert(item, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn fetch_open_reconciliation_items(&self) -> Result<Vec<ReconciliationItem>, ReconciliationError> {
        let mut conn = self.pool.acquire().await?;
        reconciliation::fetch_open_items(&mut conn).await
    }

    async fn resolve_reconciliation_item(
        &self,
        id: i64,
        outcome: LedgerOutcome,
        note: &str,
    ) -> Result<ReconciliationItem, ReconciliationError> {
        if outcome == LedgerOutcome::Duplicate {
            return Err(ReconciliationError::InvalidOutcome(outcome));
        }
        let mut tx = self.pool.begin().await?;
        let item = match reconciliation::mark_resolved(id, note, &mut tx).await? {
            Some(item) => item,
            None => {
                let existing = reconciliation::fetch_item(id, &mut tx).await?;
                return Err(match existing {
                    Some(_) => ReconciliationError::AlreadyResolved(id),
                    None => ReconciliationError::ItemNotFound(id),
                });
            },
        };
        ledger::overwrite_outcome(&item.key(), outcome, &mut tx)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        info!("🗃️ Reconciliation item #{id} for {} resolved as {outcome}", item.key());
        Ok(item)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) {
        self.pool.close().await;
    }
}
