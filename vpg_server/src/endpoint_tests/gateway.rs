use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use vpg_engine::{
    db_types::{
        Amount,
        IdempotencyKey,
        LedgerOutcome,
        NewReconciliationItem,
        ReconciliationItem,
        ReconciliationReason,
        SaleRecord,
        SlotId,
    },
    events::EventProducers,
    CallbackApi,
    ClaimResult,
    FulfillmentResult,
    IdempotencyLedger,
    InventoryManagement,
    LedgerError,
    ReconciliationError,
    ReconciliationManagement,
};

use super::{
    helpers::{ledger_record, post_form, send_request, signed_form, timestamp, verifier},
    mocks::{MockStore, StalledStore},
};
use crate::{
    data_objects::GatewayCallbackForm,
    routes::{gateway_form_config, GatewayCallbackRoute},
};

const PATH: &str = "/gateway/callback";
const REFERENCE: &str = "ORD-SLOT07-1728898200";

fn configure(store: MockStore) -> impl FnOnce(&mut ServiceConfig) {
    configure_with_timeout(store, Duration::from_secs(1))
}

fn configure_with_timeout<B>(store: B, store_timeout: Duration) -> impl FnOnce(&mut ServiceConfig)
where B: IdempotencyLedger + InventoryManagement + ReconciliationManagement + 'static {
    move |cfg| {
        let api = CallbackApi::new(store, verifier(), store_timeout, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/gateway").app_data(gateway_form_config()).service(GatewayCallbackRoute::<B>::new()),
        );
    }
}

fn queued(item: NewReconciliationItem) -> Result<ReconciliationItem, ReconciliationError> {
    Ok(ReconciliationItem {
        id: 3,
        gateway_txn_id: item.key.gateway_txn_id,
        reference: item.key.reference,
        reason: item.reason,
        detail: item.detail,
        created_at: timestamp(),
        resolved_at: None,
        resolution_note: None,
    })
}

fn sale(key: &IdempotencyKey) -> SaleRecord {
    SaleRecord {
        id: 1,
        reference: key.reference.clone(),
        gateway_txn_id: key.gateway_txn_id.clone(),
        slot_id: SlotId::from("SLOT07"),
        amount: Amount::from(450),
        currency: "MYR".to_string(),
        created_at: timestamp(),
    }
}

#[actix_web::test]
async fn paid_notification_is_fulfilled() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store
        .expect_claim()
        .withf(|key| key.gateway_txn_id == "T001" && key.reference == REFERENCE)
        .times(1)
        .returning(|key| Ok(ClaimResult::Claimed(ledger_record(key, 1))));
    store
        .expect_fulfill()
        .withf(|slot, sale| slot.as_str() == "SLOT07" && sale.amount == Amount::from(450) && sale.currency == "MYR")
        .times(1)
        .returning(|_, s| {
            let key = IdempotencyKey::new(s.gateway_txn_id, s.reference);
            Ok(FulfillmentResult::Fulfilled(sale(&key)))
        });
    store.expect_settle().withf(|_, outcome| *outcome == LedgerOutcome::Fulfilled).times(1).returning(|_, _| Ok(()));
    let form = signed_form("T001", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "RECEIVEOK");
}

#[actix_web::test]
async fn forged_signature_never_touches_the_store() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().never();
    store.expect_fulfill().never();
    let mut form = signed_form("T002", REFERENCE, "4.50", "1");
    // The customer edits the amount after the gateway signed it
    form.amount = Some("0.01".into());
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "INVALID_SIG");
}

#[actix_web::test]
async fn missing_fields_are_an_invalid_signature() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().never();
    let form = GatewayCallbackForm { payment_id: Some("T003".into()), ..Default::default() };
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "INVALID_SIG");

    let mut form = signed_form("T003", REFERENCE, "4.50", "1");
    form.signature = None;
    let (status, body) = post_form(PATH, &form, configure(MockStore::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "INVALID_SIG");
}

#[actix_web::test]
async fn undecodable_body_is_an_invalid_signature() {
    let _ = env_logger::try_init().ok();
    let req = TestRequest::post().uri(PATH).set_json(signed_form("T004", REFERENCE, "4.50", "1"));
    let (status, body) = send_request(req, configure(MockStore::new())).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "INVALID_SIG");
}

#[actix_web::test]
async fn failed_payment_is_acknowledged_without_fulfilment() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().never();
    store.expect_fulfill().never();
    let mut form = signed_form("T005", REFERENCE, "4.50", "0");
    form.error_description = Some("Customer cancelled".into());
    // The error description is not part of the signature
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "RECEIVED_FAILED_STATUS");
}

#[actix_web::test]
async fn store_failure_asks_the_gateway_to_retry() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().times(1).returning(|_| Err(LedgerError::DatabaseError("database is locked".into())));
    store.expect_fulfill().never();
    let form = signed_form("T006", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "INTERNAL_ERROR");
}

#[actix_web::test]
async fn duplicate_delivery_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().times(1).returning(|key| {
        let mut record = ledger_record(key, 2);
        record.outcome = Some(LedgerOutcome::Fulfilled);
        Ok(ClaimResult::AlreadyClaimed(record))
    });
    store.expect_fulfill().never();
    store.expect_settle().never();
    let form = signed_form("T007", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "RECEIVEOK");
}

#[actix_web::test]
async fn empty_slot_is_queued_for_reconciliation() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    store.expect_claim().times(1).returning(|key| Ok(ClaimResult::Claimed(ledger_record(key, 1))));
    store.expect_fulfill().times(1).returning(|_, _| Ok(FulfillmentResult::InsufficientStock));
    store
        .expect_flag_for_reconciliation()
        .withf(|item| item.reason == ReconciliationReason::InsufficientStock && item.key.gateway_txn_id == "T008")
        .times(1)
        .returning(queued);
    store.expect_settle().withf(|_, outcome| *outcome == LedgerOutcome::Rejected).times(1).returning(|_, _| Ok(()));
    let form = signed_form("T008", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "RECEIVEOK");
}

#[actix_web::test]
async fn abandoned_claim_is_queued_on_redelivery() {
    let _ = env_logger::try_init().ok();
    let mut store = MockStore::new();
    // Claimed long ago and never settled
    store.expect_claim().times(1).returning(|key| Ok(ClaimResult::AlreadyClaimed(ledger_record(key, 3))));
    store.expect_fulfill().never();
    store.expect_fetch_sales_for_reference().withf(|r| r == REFERENCE).times(1).returning(|_| Ok(vec![]));
    store
        .expect_flag_for_reconciliation()
        .withf(|item| item.reason == ReconciliationReason::Interrupted && item.key.gateway_txn_id == "T009")
        .times(1)
        .returning(queued);
    store.expect_settle().withf(|_, outcome| *outcome == LedgerOutcome::Rejected).times(1).returning(|_, _| Ok(()));
    let form = signed_form("T009", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure(store)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "RECEIVEOK");
}

#[actix_web::test]
async fn store_timeout_asks_the_gateway_to_retry() {
    let _ = env_logger::try_init().ok();
    let mut inner = MockStore::new();
    inner.expect_claim().never();
    inner.expect_fulfill().never();
    let store = StalledStore { inner, claim_delay: Duration::from_millis(500) };
    let form = signed_form("T010", REFERENCE, "4.50", "1");
    let (status, body) = post_form(PATH, &form, configure_with_timeout(store, Duration::from_millis(20))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "INTERNAL_ERROR");
}
