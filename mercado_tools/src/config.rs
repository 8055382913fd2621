use std::time::Duration;

use log::*;

use crate::data_objects::MercadoEndpoint;

pub const DEFAULT_MERCADO_BASE_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct MercadoConfig {
    pub base_url: String,
    pub endpoint: MercadoEndpoint,
    /// Hard deadline for a single provider call. The engine never retries; a slow provider
    /// simply costs one merchant one polling cycle.
    pub timeout: Duration,
}

impl Default for MercadoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MERCADO_BASE_URL.to_string(),
            endpoint: MercadoEndpoint::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl MercadoConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("TPS_MERCADO_BASE_URL").unwrap_or_else(|_| {
            debug!("TPS_MERCADO_BASE_URL not set, using {DEFAULT_MERCADO_BASE_URL}");
            DEFAULT_MERCADO_BASE_URL.to_string()
        });
        let endpoint = std::env::var("TPS_MERCADO_ENDPOINT")
            .ok()
            .map(|s| {
                s.parse::<MercadoEndpoint>().unwrap_or_else(|e| {
                    warn!("Ignoring invalid TPS_MERCADO_ENDPOINT: {e}. Using the default endpoint.");
                    MercadoEndpoint::default()
                })
            })
            .unwrap_or_default();
        let timeout = std::env::var("TPS_MERCADO_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        Self { base_url, endpoint, timeout }
    }
}
