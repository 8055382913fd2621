//! Request authentication for the two caller classes the server knows about: field devices
//! (bearer API key, minted at registration) and operators (the shared `TPS_OPERATOR_API_KEY`).
use actix_web::HttpRequest;
use log::*;
use terminal_payment_engine::{db_types::Device, traits::DeviceManagement, traits::PaymentStore, DeviceApi};

use crate::{config::ServerOptions, errors::ServerError, helpers::get_remote_ip};

/// Devices send their serial alongside the bearer key so authentication is a single lookup
/// instead of a fleet scan.
pub const DEVICE_SERIAL_HEADER: &str = "Device-Serial";

/// Extracts the bearer token from the `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, ServerError> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ServerError::Unauthorized)
}

/// Authenticates the calling device by its bearer key, recording its liveness as a side
/// effect. Blocked devices authenticate too; routes decide what they may do.
pub async fn authenticate_device<B>(
    req: &HttpRequest,
    api: &DeviceApi<B>,
    options: &ServerOptions,
) -> Result<Device, ServerError>
where
    B: DeviceManagement + PaymentStore,
{
    let credential = bearer_token(req)?;
    let serial = serial_hint(req);
    let ip = get_remote_ip(req, options.use_x_forwarded_for).map(|ip| ip.to_string());
    let device = api.authenticate(credential, serial.as_deref(), ip.as_deref()).await.map_err(|e| {
        debug!("📟 Device authentication failed. {e}");
        ServerError::Unauthorized
    })?;
    Ok(device)
}

/// The serial hint, from the `Device-Serial` header or, for older terminal firmware, the
/// `serial` query parameter. Serials are plain ASCII, so no percent-decoding is done.
fn serial_hint(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(DEVICE_SERIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .or_else(|| {
            req.query_string()
                .split('&')
                .find_map(|pair| pair.strip_prefix("serial="))
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
}

/// Checks the bearer key against the operator key. When no operator key is configured, every
/// request is rejected rather than letting the operator surface run open.
pub fn check_operator_key(req: &HttpRequest, options: &ServerOptions) -> Result<(), ServerError> {
    let credential = bearer_token(req)?;
    let expected = options.operator_api_key.as_ref().ok_or_else(|| {
        warn!("🔐️ An operator endpoint was called, but TPS_OPERATOR_API_KEY is not configured.");
        ServerError::Unauthorized
    })?;
    if credential == expected.reveal() {
        Ok(())
    } else {
        Err(ServerError::Unauthorized)
    }
}
