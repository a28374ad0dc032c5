//! # Callback processor public API
//!
//! * [`callback_api`] handles inbound gateway notifications. This is the core of the engine.
//! * [`payment_request_api`] signs the outbound payment requests that kiosks send to the gateway.
//! * [`reconciliation_api`] gives operators access to paid notifications that could not be fulfilled.
//! * [`inventory_api`] manages slot stock and looks up sales.
//!
//! Every API is created by supplying a backend that implements the traits it needs. Backends are cheap to clone, so
//! the same backend can be shared between APIs:
//!
//! ```rust,ignore
//! use vpg_engine::{events::EventProducers, CallbackApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/vpg_store.db", 5).await?;
//! let api = CallbackApi::new(db.clone(), verifier, DEFAULT_STORE_TIMEOUT, EventProducers::default());
//! let outcome = api.process_notification(notification).await?;
//! ```
pub mod callback_api;
pub mod callback_objects;
pub mod errors;
pub mod inventory_api;
pub mod payment_request_api;
pub mod reconciliation_api;
