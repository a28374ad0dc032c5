#![allow(dead_code)]
use std::time::Duration;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use vpg_common::Secret;
use vpg_engine::{
    events::EventProducers,
    helpers::{NotificationFields, SignatureVerifier},
    test_utils::{prepare_test_env, random_db_path},
    CallbackApi,
    PaymentNotification,
    SqliteDatabase,
};

pub mod faulty_store;

pub const MERCHANT_CODE: &str = "M00042";
pub const MERCHANT_KEY: &str = "kiosk-shared-secret";

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(MERCHANT_CODE, Secret::new(MERCHANT_KEY.to_string()))
}

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

pub async fn new_callback_api(producers: EventProducers) -> CallbackApi<SqliteDatabase> {
    let db = new_db().await;
    CallbackApi::new(db, verifier(), Duration::from_secs(5), producers)
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}

/// A notification as the gateway would send it, correctly signed.
pub fn notification(txn_id: &str, reference: &str, amount: &str, status: &str) -> PaymentNotification {
    let fields = NotificationFields::new(MERCHANT_CODE, txn_id, reference, amount, "MYR", status);
    let signature = verifier().sign(&fields).expect("Error signing notification");
    PaymentNotification::new(fields, Some(signature))
}
