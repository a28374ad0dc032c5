//! # Storage contracts
//!
//! This module defines the behaviour a storage backend must expose to act as a backend for the callback processor.
//!
//! * [`IdempotencyLedger`] records which gateway notifications have been claimed. `claim` is an atomic
//!   check-and-insert: for any key, exactly one caller ever observes [`ClaimResult::Claimed`].
//! * [`InventoryManagement`] owns the slot stock levels and the sale records. `fulfill` decrements stock and writes the
//!   sale as one indivisible unit.
//! * [`ReconciliationManagement`] keeps the queue of authenticated notifications that could not be fulfilled and need
//!   a human to look at them.
//!
//! Two backends are provided: [`crate::SqliteDatabase`] for durable deployments and [`crate::MemoryDatabase`] for
//! single-instance use and tests.
mod data_objects;
mod idempotency_ledger;
mod inventory_management;
mod reconciliation_management;

pub use data_objects::{ClaimResult, FulfillmentResult};
pub use idempotency_ledger::{IdempotencyLedger, LedgerError};
pub(crate) use inventory_management::validate_stock;
pub use inventory_management::{InventoryError, InventoryManagement};
pub use reconciliation_management::{ReconciliationError, ReconciliationManagement};
