use std::fmt::Debug;

use crate::{
    db_types::{InventorySlot, SaleRecord, SlotId},
    traits::{InventoryError, InventoryManagement},
};

/// Kiosk stock management and sale lookups.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError> {
        self.db.fetch_slot(slot).await
    }

    /// Creates the slot, or sets its stock and capacity after a restock.
    pub async fn set_stock(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError> {
        self.db.upsert_slot(slot, stock, capacity).await
    }

    pub async fn sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError> {
        self.db.fetch_sales_for_reference(reference).await
    }

    pub async fn sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError> {
        self.db.fetch_sales_for_slot(slot).await
    }
}
