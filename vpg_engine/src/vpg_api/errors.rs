use thiserror::Error;

use crate::{
    db_types::SlotId,
    helpers::{ReferenceError, SignatureError},
    traits::{InventoryError, LedgerError, ReconciliationError},
};

/// A failure of the store underneath the callback processor. This is the only class of error that makes the gateway
/// retry, since the notification itself was fine.
#[derive(Debug, Clone, Error)]
pub enum CallbackError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
    #[error("Reconciliation error: {0}")]
    Reconciliation(#[from] ReconciliationError),
    #[error("The store did not complete '{0}' in time")]
    Timeout(&'static str),
}

#[derive(Debug, Clone, Error)]
pub enum PaymentRequestError {
    #[error("Slot {0} does not exist")]
    UnknownTarget(SlotId),
    #[error("Slot {0} is out of stock")]
    OutOfStock(SlotId),
    #[error("Payment requests must be for a positive amount")]
    InvalidAmount,
    #[error("Cannot build a reference. {0}")]
    Reference(#[from] ReferenceError),
    #[error("Cannot sign the request. {0}")]
    Signature(#[from] SignatureError),
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),
}
