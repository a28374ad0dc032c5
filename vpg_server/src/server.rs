use std::time::Duration;

use actix_web::{
    dev::{Server, Service, ServiceResponse},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    Error,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::*;
use vpg_engine::{
    events::EventProducers,
    helpers::SignatureVerifier,
    CallbackApi,
    IdempotencyLedger,
    InventoryApi,
    InventoryManagement,
    MemoryDatabase,
    PaymentRequestApi,
    ReconciliationApi,
    ReconciliationManagement,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    helpers::{get_remote_ip, is_whitelisted},
    integrations::operator_log::create_operator_log_handlers,
    middleware::AdminKeyMiddlewareFactory,
    routes::{
        gateway_form_config,
        health,
        GatewayCallbackRoute,
        PaymentRequestRoute,
        ReconciliationItemsRoute,
        ResolveReconciliationRoute,
        SalesRoute,
        SetSlotStockRoute,
        SlotRoute,
    },
};

/// Setting `VPG_DATABASE_URL` to this value runs the server on the in-memory store. Nothing survives a restart.
pub const MEMORY_DATABASE_URL: &str = "memory";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    if config.gateway.merchant_key.is_empty() {
        warn!("🚨️ No merchant key is configured. Every gateway notification will be rejected.");
    }
    let handlers = create_operator_log_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = if config.database_url.trim() == MEMORY_DATABASE_URL {
        warn!("🗃️ Using the in-memory store. The idempotency ledger and stock levels will not survive a restart.");
        create_server_instance(config, MemoryDatabase::new(), producers)?
    } else {
        let db = SqliteDatabase::new_with_url(&config.database_url, 25)
            .await
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
        info!("🗃️ Database {} is ready", db.url());
        create_server_instance(config, db, producers)?
    };
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B>(
    config: ServerConfig,
    db: B,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: IdempotencyLedger + InventoryManagement + ReconciliationManagement + Clone + Send + 'static,
{
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let verifier = SignatureVerifier::new(&config.gateway.merchant_code, config.gateway.merchant_key.clone());
        let callback_api = CallbackApi::new(db.clone(), verifier.clone(), config.store_timeout, producers.clone());
        let payment_request_api = PaymentRequestApi::new(db.clone(), verifier, &config.gateway.default_currency);
        let reconciliation_api = ReconciliationApi::new(db.clone());
        let inventory_api = InventoryApi::new(db.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("vpg::access_log"))
            .app_data(web::Data::new(callback_api))
            .app_data(web::Data::new(payment_request_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(inventory_api));
        let options = options.clone();
        let gateway_scope = web::scope("/gateway")
            .app_data(gateway_form_config())
            .wrap_fn(move |req, srv| {
                let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
                if is_whitelisted(peer_ip, &options.gateway_whitelist) {
                    srv.call(req).map(|res| res.map(ServiceResponse::map_into_boxed_body)).boxed_local()
                } else {
                    ok::<_, Error>(req.error_response(ServerError::ForbiddenPeer)).boxed_local()
                }
            })
            .service(GatewayCallbackRoute::<B>::new());
        let app = app.service(health).service(PaymentRequestRoute::<B>::new()).service(gateway_scope);
        match &config.admin_api_key {
            Some(key) => {
                let admin_scope = web::scope("/admin")
                    .wrap(AdminKeyMiddlewareFactory::new(key.clone()))
                    .service(ReconciliationItemsRoute::<B>::new())
                    .service(ResolveReconciliationRoute::<B>::new())
                    .service(SlotRoute::<B>::new())
                    .service(SetSlotStockRoute::<B>::new())
                    .service(SalesRoute::<B>::new());
                app.service(admin_scope)
            },
            None => app,
        }
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
