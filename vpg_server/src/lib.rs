//! # VPG server
//! This crate hosts the HTTP surface of the vending payment gateway. It is responsible for:
//! * Receiving the gateway's server-to-server payment notifications and answering them with the exact plain-text
//!   acknowledgements the gateway expects.
//! * Signing the payment requests kiosks send to the gateway's payment page.
//! * Giving operators access to the reconciliation queue, slot stock levels and sale records.
//!
//! All payment logic lives in `vpg_engine`. This crate only decodes requests, calls the engine APIs and encodes
//! responses.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/gateway/callback`: The gateway notification webhook. Optionally restricted to whitelisted gateway IPs.
//! * `/payment_request`: Returns a signed payment request for one item from a slot.
//! * `/admin/*`: Reconciliation and inventory routes. Only mounted when `VPG_ADMIN_API_KEY` is set.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
