use std::time::Duration;

use cucumber::World;
use log::*;
use vpg_common::Secret;
use vpg_engine::{
    events::EventProducers,
    helpers::SignatureVerifier,
    test_utils::{create_database, random_db_path, run_migrations},
    CallbackApi,
    CallbackOutcome,
    SqliteDatabase,
};

pub const MERCHANT_CODE: &str = "M00042";
pub const MERCHANT_KEY: &str = "kiosk-shared-secret";

#[derive(Default, Debug, World)]
pub struct KioskWorld {
    pub system: Option<KioskSystem>,
    pub last_outcome: Option<CallbackOutcome>,
}

#[derive(Debug)]
pub struct KioskSystem {
    pub db_path: String,
    pub api: CallbackApi<SqliteDatabase>,
}

impl KioskWorld {
    pub fn api(&self) -> &CallbackApi<SqliteDatabase> {
        &self.system.as_ref().expect("CallbackApi not initialised").api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        self.api().verifier()
    }
}

impl KioskSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let verifier = SignatureVerifier::new(MERCHANT_CODE, Secret::new(MERCHANT_KEY.to_string()));
        let api = CallbackApi::new(db, verifier, Duration::from_secs(5), EventProducers::default());
        Self { db_path: url, api }
    }
}
