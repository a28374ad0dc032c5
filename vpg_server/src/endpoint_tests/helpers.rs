use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use vpg_common::Secret;
use vpg_engine::{
    db_types::{IdempotencyKey, IdempotencyRecord},
    helpers::{NotificationFields, SignatureVerifier},
};

use crate::data_objects::GatewayCallbackForm;

pub const MERCHANT_CODE: &str = "M00042";
// Test-only secrets. DO NOT re-use these anywhere.
pub const MERCHANT_KEY: &str = "endpoint-test-secret";
pub const ADMIN_KEY: &str = "endpoint-test-admin-key";

pub fn verifier() -> SignatureVerifier {
    SignatureVerifier::new(MERCHANT_CODE, Secret::new(MERCHANT_KEY.to_string()))
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 14, 9, 30, 0).unwrap()
}

pub fn ledger_record(key: &IdempotencyKey, deliveries: i64) -> IdempotencyRecord {
    IdempotencyRecord {
        gateway_txn_id: key.gateway_txn_id.clone(),
        reference: key.reference.clone(),
        first_seen_at: timestamp(),
        last_seen_at: timestamp(),
        deliveries,
        outcome: None,
    }
}

/// A gateway callback form, correctly signed with the test merchant key.
pub fn signed_form(txn_id: &str, reference: &str, amount: &str, status: &str) -> GatewayCallbackForm {
    let fields = NotificationFields::new(MERCHANT_CODE, txn_id, reference, amount, "MYR", status);
    let signature = verifier().sign(&fields).expect("Error signing notification");
    GatewayCallbackForm {
        merchant_code: fields.merchant_code,
        payment_id: fields.transaction_id,
        ref_no: fields.reference,
        amount: fields.amount,
        currency: fields.currency,
        status: fields.status,
        signature: Some(signature),
        error_description: None,
    }
}

pub async fn send_request<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = res.into_body().try_into_bytes().map_err(|_| "Could not read response body".to_string())?;
    Ok((status, String::from_utf8_lossy(&body).into_owned()))
}

pub async fn post_form<F>(path: &str, form: &GatewayCallbackForm, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = TestRequest::post().uri(path).set_form(form);
    send_request(req, configure).await.expect("Request failed")
}
