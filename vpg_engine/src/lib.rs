//! Vending Payment Gateway engine
//!
//! The engine processes the asynchronous payment notifications a third-party gateway sends after a customer pays at
//! a vending kiosk. It authenticates each notification, makes sure it is acted on at most once, and releases one unit
//! of stock with a matching sale record. It is independent of the HTTP layer.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the backends that implement them: SQLite ([`SqliteDatabase`]) and an
//!    in-memory store ([`MemoryDatabase`]). The data types stored by the backends live in [`mod@db_types`].
//! 2. The public API ([`mod@vpg_api`]). [`CallbackApi`] runs the notification protocol. The reconciliation, inventory
//!    and payment request APIs serve operators and kiosks.
//! 3. Gateway wire helpers ([`mod@helpers`]): reference encoding and message signatures.
//!
//! The engine also publishes events when a sale is fulfilled or a payment needs reconciliation. See [`mod@events`].
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;
pub mod vpg_api;

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::{db::db_url, SqliteDatabase};
pub use traits::{
    ClaimResult,
    FulfillmentResult,
    IdempotencyLedger,
    InventoryError,
    InventoryManagement,
    LedgerError,
    ReconciliationError,
    ReconciliationManagement,
};
pub use vpg_api::{
    callback_api::{CallbackApi, DEFAULT_STORE_TIMEOUT},
    callback_objects::{CallbackOutcome, PaymentNotification, SignedPaymentRequest, SUCCESS_STATUS},
    errors::{CallbackError, PaymentRequestError},
    inventory_api::InventoryApi,
    payment_request_api::PaymentRequestApi,
    reconciliation_api::ReconciliationApi,
};
