use std::env;

use chrono::Duration;
use log::*;
use mercado_tools::MercadoConfig;
use tps_common::{helpers::env_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_TPS_HOST: &str = "127.0.0.1";
const DEFAULT_TPS_PORT: u16 = 8360;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_LOOKBACK_HOURS: i64 = 3;
const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The vault master key, 64 hex characters. The server refuses to start without it, since
    /// merchant tokens written under a throwaway key would be lost on restart.
    pub vault_key: Secret<String>,
    /// The shared key for the operator surface (`/poll` and `/admin`). When unset, those
    /// routes reject every request.
    pub operator_api_key: Option<Secret<String>>,
    /// How often the background worker polls the provider for all merchants.
    pub poll_interval: std::time::Duration,
    /// How far back each provider query reaches.
    pub poll_lookback: Duration,
    /// How many records each provider query asks for, per merchant.
    pub poll_page_size: u32,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// Payment provider endpoint configuration.
    pub mercado: MercadoConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        let host = env::var("TPS_HOST").ok().unwrap_or_else(|| DEFAULT_TPS_HOST.into());
        let port = env::var("TPS_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TPS_PORT. {e} Using the default, {DEFAULT_TPS_PORT}, instead."
                    );
                    DEFAULT_TPS_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TPS_PORT);
        let database_url = env::var("TPS_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ TPS_DATABASE_URL is not set. Please set it to the URL for the payments database.");
            String::default()
        });
        let vault_key = env::var("TPS_VAULT_KEY").map(Secret::new).map_err(|_| {
            ServerError::ConfigurationError(
                "TPS_VAULT_KEY is not set. Set it to a 64-character hex key. Merchant access tokens are \
                 encrypted under this key, so it must be stable across restarts."
                    .to_string(),
            )
        })?;
        let operator_api_key = env::var("TPS_OPERATOR_API_KEY").ok().map(Secret::new);
        if operator_api_key.is_none() {
            warn!(
                "🪛️ TPS_OPERATOR_API_KEY is not set. The /poll and /admin endpoints will reject all requests until \
                 it is configured."
            );
        }
        let poll_interval = env::var("TPS_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for TPS_POLL_INTERVAL_SECS. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let poll_lookback = env::var("TPS_POLL_LOOKBACK_HOURS")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for TPS_POLL_LOOKBACK_HOURS. {e}"))
                    .ok()
            })
            .map(Duration::hours)
            .unwrap_or_else(|| Duration::hours(DEFAULT_LOOKBACK_HOURS));
        let poll_page_size = env::var("TPS_POLL_PAGE_SIZE")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for TPS_POLL_PAGE_SIZE. {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let use_x_forwarded_for = env_flag("TPS_USE_X_FORWARDED_FOR", false);
        let mercado = MercadoConfig::new_from_env_or_default();
        Ok(Self {
            host,
            port,
            database_url,
            vault_key,
            operator_api_key,
            poll_interval: std::time::Duration::from_secs(poll_interval),
            poll_lookback,
            poll_page_size,
            use_x_forwarded_for,
            mercado,
        })
    }
}

/// A subset of the server configuration that route handlers need. We try to keep this as small
/// as possible and exclude secrets other than the operator key, which the handlers must
/// compare against.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub operator_api_key: Option<Secret<String>>,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            use_x_forwarded_for: config.use_x_forwarded_for,
            operator_api_key: config.operator_api_key.clone(),
        }
    }
}
