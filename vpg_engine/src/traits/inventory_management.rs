use thiserror::Error;

use crate::{
    db_types::{InventorySlot, NewSale, SaleRecord, SlotId},
    traits::FulfillmentResult,
};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Inventory storage error: {0}")]
    DatabaseError(String),
    #[error("Stock level {stock} is not valid for a slot with capacity {capacity}")]
    CapacityExceeded { stock: i64, capacity: i64 },
    #[error("Stock and capacity cannot be negative")]
    NegativeStock,
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// Slot stock levels and sale records.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Releases one unit from the slot and records the sale, as a single atomic unit.
    ///
    /// No reader may ever observe the decremented stock without the sale record, or vice versa. A slot at zero stock
    /// returns [`FulfillmentResult::InsufficientStock`] and a missing slot returns
    /// [`FulfillmentResult::UnknownTarget`]; neither changes anything.
    ///
    /// Callers must only call this once per successful ledger claim.
    async fn fulfill(&self, slot: &SlotId, sale: NewSale) -> Result<FulfillmentResult, InventoryError>;

    async fn fetch_slot(&self, slot: &SlotId) -> Result<Option<InventorySlot>, InventoryError>;

    /// Creates the slot, or replaces its stock level and capacity. Used when a kiosk is restocked.
    async fn upsert_slot(&self, slot: &SlotId, stock: i64, capacity: i64) -> Result<InventorySlot, InventoryError>;

    async fn fetch_sales_for_reference(&self, reference: &str) -> Result<Vec<SaleRecord>, InventoryError>;

    async fn fetch_sales_for_slot(&self, slot: &SlotId) -> Result<Vec<SaleRecord>, InventoryError>;
}

/// Shared validation for `upsert_slot` implementations.
pub(crate) fn validate_stock(stock: i64, capacity: i64) -> Result<(), InventoryError> {
    if stock < 0 || capacity < 0 {
        return Err(InventoryError::NegativeStock);
    }
    if stock > capacity {
        return Err(InventoryError::CapacityExceeded { stock, capacity });
    }
    Ok(())
}
