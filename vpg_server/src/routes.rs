//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every store operation here is async, and the callback processor
//! bounds the ones that contend for locks with a timeout.
//!
//! The gateway callback route is special: its response bodies are part of the gateway protocol, so it builds exact
//! plain-text responses itself instead of going through [`ServerError`].
use std::str::FromStr;

use actix_web::{error::InternalError, get, http::header::ContentType, web, HttpRequest, HttpResponse, Responder};
use log::*;
use vpg_engine::{
    db_types::{Amount, SlotId},
    CallbackApi,
    CallbackOutcome,
    IdempotencyLedger,
    InventoryApi,
    InventoryManagement,
    PaymentNotification,
    PaymentRequestApi,
    ReconciliationApi,
    ReconciliationManagement,
};

use crate::{
    data_objects::{GatewayCallbackForm, PaymentRequestParams, ResolveReconciliationParams, SlotStockParams},
    errors::ServerError,
};

pub const INVALID_SIGNATURE_BODY: &str = "INVALID_SIG";
pub const RECEIVED_OK_BODY: &str = "RECEIVEOK";
pub const RECEIVED_FAILED_STATUS_BODY: &str = "RECEIVED_FAILED_STATUS";
pub const INTERNAL_ERROR_BODY: &str = "INTERNAL_ERROR";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------  Gateway  ----------------------------------------------------
fn plain_text(mut builder: actix_web::HttpResponseBuilder, body: &'static str) -> HttpResponse {
    builder.insert_header(ContentType::plaintext()).body(body)
}

pub fn invalid_signature_response() -> HttpResponse {
    plain_text(HttpResponse::BadRequest(), INVALID_SIGNATURE_BODY)
}

/// The form extractor configuration for the gateway callback. A body that cannot be decoded is answered exactly like
/// a bad signature.
pub fn gateway_form_config() -> web::FormConfig {
    web::FormConfig::default().error_handler(|err, _req| {
        warn!("🔐️ Could not decode gateway notification. {err}");
        InternalError::from_response(err, invalid_signature_response()).into()
    })
}

route!(gateway_callback => Post "/callback" impl IdempotencyLedger, InventoryManagement, ReconciliationManagement);
/// Route handler for the payment gateway's server-to-server notification.
///
/// | Outcome                                        | Response                     |
/// |------------------------------------------------|------------------------------|
/// | Signature missing or invalid                   | 400 `INVALID_SIG`            |
/// | Paid; fulfilled, duplicate or queued           | 200 `RECEIVEOK`              |
/// | Authentic, but the payment did not succeed     | 200 `RECEIVED_FAILED_STATUS` |
/// | Store failure or timeout                       | 500 `INTERNAL_ERROR`         |
///
/// Only a 500 makes the gateway retry.
pub async fn gateway_callback<B>(
    req: HttpRequest,
    body: web::Form<GatewayCallbackForm>,
    api: web::Data<CallbackApi<B>>,
) -> HttpResponse
where
    B: IdempotencyLedger + InventoryManagement + ReconciliationManagement,
{
    trace!("💻️ Received gateway notification from {:?}", req.connection_info().peer_addr());
    let notification = PaymentNotification::from(body.into_inner());
    match api.process_notification(notification).await {
        Ok(CallbackOutcome::Rejected) => invalid_signature_response(),
        Ok(CallbackOutcome::Acknowledged) => plain_text(HttpResponse::Ok(), RECEIVED_FAILED_STATUS_BODY),
        Ok(outcome) => {
            debug!("💻️ Gateway notification handled: {outcome:?}");
            plain_text(HttpResponse::Ok(), RECEIVED_OK_BODY)
        },
        Err(e) => {
            error!("💻️ Gateway notification could not be processed. The gateway will retry. {e}");
            plain_text(HttpResponse::InternalServerError(), INTERNAL_ERROR_BODY)
        },
    }
}

//----------------------------------------------  Payment requests  ----------------------------------------------------
route!(payment_request => Post "/payment_request" impl InventoryManagement);
/// Builds and signs the form a kiosk posts to the gateway to start a payment for one item from a slot.
pub async fn payment_request<B: InventoryManagement>(
    body: web::Json<PaymentRequestParams>,
    api: web::Data<PaymentRequestApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST payment request for slot {} ({})", params.slot_id, params.amount);
    let amount = Amount::from_str(&params.amount).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    let slot = SlotId::from(params.slot_id);
    let request = api.new_request(&slot, amount, params.currency, params.extension).await?;
    Ok(HttpResponse::Ok().json(request))
}

//----------------------------------------------  Admin  ----------------------------------------------------
route!(reconciliation_items => Get "/reconciliation" impl ReconciliationManagement);
pub async fn reconciliation_items<B: ReconciliationManagement>(
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET open reconciliation items");
    let items = api.open_items().await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(resolve_reconciliation => Post "/reconciliation/{id}" impl ReconciliationManagement);
pub async fn resolve_reconciliation<B: ReconciliationManagement>(
    path: web::Path<i64>,
    body: web::Json<ResolveReconciliationParams>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let params = body.into_inner();
    info!("💻️ Resolving reconciliation item #{id} as {}", params.outcome);
    let item = api.resolve(id, params.outcome, &params.note).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(slot => Get "/slots/{id}" impl InventoryManagement);
pub async fn slot<B: InventoryManagement>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slot = SlotId::from(path.into_inner());
    trace!("💻️ GET slot {slot}");
    let state = api.slot(&slot).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Slot {slot}")))?;
    Ok(HttpResponse::Ok().json(state))
}

route!(set_slot_stock => Put "/slots/{id}" impl InventoryManagement);
pub async fn set_slot_stock<B: InventoryManagement>(
    path: web::Path<String>,
    body: web::Json<SlotStockParams>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let slot = SlotId::from(path.into_inner());
    let params = body.into_inner();
    info!("💻️ Setting slot {slot} to {}/{}", params.stock, params.capacity);
    let state = api.set_stock(&slot, params.stock, params.capacity).await?;
    Ok(HttpResponse::Ok().json(state))
}

route!(sales => Get "/sales/{reference}" impl InventoryManagement);
pub async fn sales<B: InventoryManagement>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let reference = path.into_inner();
    trace!("💻️ GET sales for {reference}");
    let sales = api.sales_for_reference(&reference).await?;
    Ok(HttpResponse::Ok().json(sales))
}
