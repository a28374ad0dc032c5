//! SQLite backend for the callback processor.
//!
//! The ledger's uniqueness guarantee comes from the `(gateway_txn_id, reference)` primary key, and fulfilment runs
//! inside a single database transaction.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
