//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! Rows are always read with `fetch_all`, including `RETURNING` clauses and single-row lookups. A statement that is
//! not stepped to completion keeps its transaction open, and its write stays invisible to every other connection.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod inventory;
pub mod ledger;
pub mod reconciliation;

const SQLITE_DB_URL: &str = "sqlite://data/vpg_store.db";

pub fn db_url() -> String {
    let result = env::var("VPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("VPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Concurrent deliveries contend for the write lock. Writers wait this long before SQLite reports the database as busy.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options =
        SqliteConnectOptions::from_str(url)?.create_if_missing(true).foreign_keys(true).busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
