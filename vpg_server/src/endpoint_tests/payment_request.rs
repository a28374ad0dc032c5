use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use vpg_engine::{
    db_types::{InventorySlot, SlotId},
    helpers::PaymentRequestFields,
    InventoryError,
    PaymentRequestApi,
    SignedPaymentRequest,
};

use super::{
    helpers::{send_request, timestamp, verifier, MERCHANT_CODE},
    mocks::MockStore,
};
use crate::routes::PaymentRequestRoute;

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentRequestApi::new(store, verifier(), "MYR");
        cfg.app_data(web::Data::new(api)).service(PaymentRequestRoute::<MockStore>::new());
    }
}

fn stocked(stock: i64) -> impl Fn(&SlotId) -> Result<Option<InventorySlot>, InventoryError> + Send + 'static {
    move |slot| {
        Ok(Some(InventorySlot { id: slot.clone(), current_stock: stock, capacity: 10, updated_at: timestamp() }))
    }
}

#[actix_web::test]
async fn signed_request_for_stocked_slot() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_slot().withf(|slot| slot.as_str() == "SLOT07").times(1).returning(stocked(3));
    let req = TestRequest::post()
        .uri("/payment_request")
        .set_json(serde_json::json!({"slot_id": "SLOT07", "amount": "4.50"}));
    let (status, body) = send_request(req, configure(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let request: SignedPaymentRequest = serde_json::from_str(&body).unwrap();
    assert_eq!(request.merchant_code, MERCHANT_CODE);
    assert!(request.reference.starts_with("ORD-SLOT07-"));
    assert_eq!(request.amount, "4.50");
    assert_eq!(request.currency, "MYR");
    let fields = PaymentRequestFields {
        reference: request.reference.clone(),
        amount: request.amount.clone(),
        currency: request.currency.clone(),
        extension: None,
    };
    assert_eq!(request.signature, verifier().sign_request(&fields).unwrap());
}

#[actix_web::test]
async fn empty_slot_cannot_be_sold() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_slot().times(1).returning(stocked(0));
    let req = TestRequest::post()
        .uri("/payment_request")
        .set_json(serde_json::json!({"slot_id": "SLOT07", "amount": "4.50", "currency": "SGD"}));
    let (status, _) = send_request(req, configure(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn unknown_slot_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_fetch_slot().times(1).returning(|_| Ok(None));
    let req = TestRequest::post()
        .uri("/payment_request")
        .set_json(serde_json::json!({"slot_id": "SLOT42", "amount": "1.00"}));
    let (status, _) = send_request(req, configure(store)).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bad_amounts_are_rejected_before_any_lookup() {
    let _ = env_logger::try_init().ok();
    for amount in ["four fifty", "0.00", "1.005"] {
        let mut store = MockStore::new();
        store.expect_fetch_slot().never();
        let req = TestRequest::post()
            .uri("/payment_request")
            .set_json(serde_json::json!({"slot_id": "SLOT07", "amount": amount}));
        let (status, _) = send_request(req, configure(store)).await.expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}");
    }
}
