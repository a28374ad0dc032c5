//! Admin key middleware for Actix Web.
//!
//! Operators reach the `/admin` routes (reconciliation queue, stock levels, sale lookups) by sending the configured
//! `VPG_ADMIN_API_KEY` in the `X-Vpg-Admin-Key` header. Requests without a matching key never reach the handlers.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use vpg_common::Secret;

use crate::errors::ServerError;

pub const ADMIN_KEY_HEADER: &str = "X-Vpg-Admin-Key";

pub struct AdminKeyMiddlewareFactory {
    key: Secret<String>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(key: Secret<String>) -> Self {
        AdminKeyMiddlewareFactory { key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AdminKeyMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminKeyMiddlewareService { key: self.key.clone(), service: Rc::new(service) }))
    }
}

pub struct AdminKeyMiddlewareService<S> {
    key: Secret<String>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = self.key.clone();
        Box::pin(async move {
            trace!("🔐️ Checking admin key for request to {}", req.path());
            let provided = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
            match provided {
                Some(candidate) if !key.is_empty() && key.matches(candidate) => {
                    trace!("🔐️ Admin key check ✅️");
                    service.call(req).await
                },
                Some(_) => {
                    warn!("🔐️ Invalid admin key supplied for {}. Denying access.", req.path());
                    Err(ServerError::InvalidAdminKey.into())
                },
                None => {
                    warn!("🔐️ No admin key supplied for {}. Denying access.", req.path());
                    Err(ServerError::InvalidAdminKey.into())
                },
            }
        })
    }
}
