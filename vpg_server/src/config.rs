use std::{env, net::IpAddr, time::Duration};

use log::*;
use vpg_common::{
    helpers::{is_disabled_token, parse_boolean_flag},
    Secret,
    DEFAULT_CURRENCY_CODE,
};
use vpg_engine::DEFAULT_STORE_TIMEOUT;

const DEFAULT_VPG_HOST: &str = "127.0.0.1";
const DEFAULT_VPG_PORT: u16 = 8370;
const DEFAULT_VPG_DATABASE_URL: &str = "sqlite://data/vpg_store.db";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// A SQLite URL, or `memory` to run with the non-persistent in-memory store.
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Upper bound on the ledger claim and the fulfilment transaction for a single notification.
    pub store_timeout: Duration,
    /// When set, the `/admin` routes are mounted and require this key in the `X-Vpg-Admin-Key` header.
    pub admin_api_key: Option<Secret<String>>,
    pub gateway: GatewayConfig,
}

#[derive(Clone, Debug, Default)]
pub struct GatewayConfig {
    pub merchant_code: String,
    /// The secret shared with the payment gateway. Notifications are signed with it.
    pub merchant_key: Secret<String>,
    pub default_currency: String,
    /// If supplied, requests against `/gateway` endpoints will be checked against a whitelist of gateway IP
    /// addresses. To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_VPG_HOST.to_string(),
            port: DEFAULT_VPG_PORT,
            database_url: DEFAULT_VPG_DATABASE_URL.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            admin_api_key: None,
            gateway: GatewayConfig {
                default_currency: DEFAULT_CURRENCY_CODE.to_string(),
                ..Default::default()
            },
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("VPG_HOST").ok().unwrap_or_else(|| DEFAULT_VPG_HOST.into());
        let port = env::var("VPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for VPG_PORT. {e} Using the default, {DEFAULT_VPG_PORT}, instead."
                    );
                    DEFAULT_VPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_VPG_PORT);
        let database_url = env::var("VPG_DATABASE_URL").ok().unwrap_or_else(|| {
            info!("🪛️ VPG_DATABASE_URL is not set. Using the default, {DEFAULT_VPG_DATABASE_URL}.");
            DEFAULT_VPG_DATABASE_URL.to_string()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("VPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("VPG_USE_FORWARDED").ok(), false);
        let store_timeout = configure_store_timeout(env::var("VPG_STORE_TIMEOUT_MS").ok());
        let admin_api_key = env::var("VPG_ADMIN_API_KEY").ok().filter(|s| !s.trim().is_empty()).map(Secret::new);
        if admin_api_key.is_none() {
            info!("🪛️ VPG_ADMIN_API_KEY is not set. The /admin routes are disabled.");
        }
        let gateway = GatewayConfig::from_env_or_defaults();
        Self { host, port, database_url, use_x_forwarded_for, use_forwarded, store_timeout, admin_api_key, gateway }
    }
}

impl GatewayConfig {
    pub fn from_env_or_defaults() -> Self {
        let merchant_code = env::var("VPG_MERCHANT_CODE").ok().unwrap_or_else(|| {
            error!("🪛️ VPG_MERCHANT_CODE is not set. Please set it to the merchant code issued by the gateway.");
            String::default()
        });
        let merchant_key = env::var("VPG_MERCHANT_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ VPG_MERCHANT_KEY is not set. Please set it to the merchant key issued by the gateway. Every \
                 notification will be rejected until you do."
            );
            String::default()
        });
        let default_currency = env::var("VPG_DEFAULT_CURRENCY")
            .ok()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE.to_string());
        let whitelist = parse_whitelist(env::var("VPG_GATEWAY_IP_WHITELIST").ok());
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty.  The server will run, but won't \
                     accept any payment notifications."
                );
            },
            None => {
                info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Gateway IP whitelist: {addrs}");
            },
        }
        Self { merchant_code, merchant_key: Secret::new(merchant_key), default_currency, whitelist }
    }
}

fn configure_store_timeout(value: Option<String>) -> Duration {
    match value.map(|s| s.trim().parse::<u64>()) {
        None => DEFAULT_STORE_TIMEOUT,
        Some(Ok(ms)) if ms > 0 => Duration::from_millis(ms),
        Some(Ok(_)) => {
            warn!("🪛️ VPG_STORE_TIMEOUT_MS must be positive. Using the default of {DEFAULT_STORE_TIMEOUT:?}.");
            DEFAULT_STORE_TIMEOUT
        },
        Some(Err(e)) => {
            warn!("🪛️ Invalid configuration value for VPG_STORE_TIMEOUT_MS. {e}. Using {DEFAULT_STORE_TIMEOUT:?}.");
            DEFAULT_STORE_TIMEOUT
        },
    }
}

fn parse_whitelist(value: Option<String>) -> Option<Vec<IpAddr>> {
    let s = value?;
    if is_disabled_token(&s) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set VPG_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in VPG_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
    pub gateway_whitelist: Option<Vec<IpAddr>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
            gateway_whitelist: config.gateway.whitelist.clone(),
        }
    }
}
