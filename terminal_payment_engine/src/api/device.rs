use chrono::Utc;
use log::*;
use rand::RngCore;
use tps_common::{Money, Secret};

use crate::{
    api::errors::DeviceApiError,
    db_types::{Device, DeviceStatus, Merchant, NewMerchant, NewPayment, Payment, PAYMENT_STATUS_NOTIFIED},
    traits::{DeviceManagement, DeviceStoreError, PaymentStore},
    vault::{hash_api_key, to_hex, token_fingerprint, verify_api_key, Vault},
};

/// The stable message a blocked device receives. Operators script against this string, so it
/// must stay distinguishable from a generic authentication failure.
pub const BLOCKED_DEVICE_MESSAGE: &str = "Device blocked. Contact support.";

pub const DEFAULT_PAYMENT_LIMIT: u32 = 20;
pub const MAX_PAYMENT_LIMIT: u32 = 50;

const DEFAULT_PLAN: &str = "basic";

/// How a registering device proves which merchant it belongs to.
#[derive(Debug, Clone)]
pub enum MerchantBinding {
    /// The caller supplies the merchant's live provider token inline. The gateway reuses the
    /// merchant that already holds this token, or creates one.
    DirectToken { access_token: Secret<String>, merchant_name: Option<String> },
    /// The caller supplies a pre-shared code that must resolve to an already-configured
    /// merchant.
    ActivationCode(String),
}

#[derive(Debug, Clone)]
pub struct RegisterDevice {
    pub serial: String,
    pub binding: MerchantBinding,
}

/// The one-time registration result. The plaintext API key is returned here and never again.
#[derive(Debug)]
pub struct RegisteredDevice {
    pub device_id: i64,
    pub merchant_id: i64,
    pub api_key: Secret<String>,
}

/// The device gateway: authentication, registration, the payment feed, and the small
/// administrative surface whose rows the gateway consumes.
#[derive(Clone)]
pub struct DeviceApi<B>
where B: DeviceManagement + PaymentStore
{
    db: B,
    vault: Vault,
}

impl<B> DeviceApi<B>
where B: DeviceManagement + PaymentStore
{
    pub fn new(db: B, vault: Vault) -> Self {
        Self { db, vault }
    }

    /// Authenticates a device by its bearer API key.
    ///
    /// With a serial hint this is a single lookup and one hash verification. Without one, the
    /// whole fleet is scanned and verified one by one; at ~100ms per argon2 verification that
    /// is only acceptable for small fleets, so terminals are expected to send their serial.
    ///
    /// A successful authentication updates `last_seen`/`last_ip` as a side effect. Blocked
    /// devices still authenticate; callers decide what a blocked device may do.
    pub async fn authenticate(
        &self,
        credential: &str,
        serial_hint: Option<&str>,
        ip: Option<&str>,
    ) -> Result<Device, DeviceApiError> {
        let device = match serial_hint {
            Some(serial) => self
                .db
                .fetch_device_by_serial(serial)
                .await?
                .filter(|d| verify_api_key(credential, &d.api_key_hash)),
            None => {
                debug!("📟 Device authentication without a serial hint. Scanning the fleet.");
                self.db.fetch_devices().await?.into_iter().find(|d| verify_api_key(credential, &d.api_key_hash))
            },
        };
        let device = device.ok_or(DeviceApiError::Unauthorized)?;
        self.db.update_device_liveness(device.id, ip, Utc::now()).await?;
        Ok(device)
    }

    /// Registers a device, or re-registers an existing serial.
    ///
    /// Re-registration rotates the credential and forces the device back to `Active`; this is
    /// the self-service recovery path for a blocked terminal, separate from the admin
    /// unblock. The returned plaintext key is minted fresh every time and never stored.
    pub async fn register(&self, request: RegisterDevice) -> Result<RegisteredDevice, DeviceApiError> {
        if request.serial.trim().is_empty() {
            return Err(DeviceApiError::InvalidRegistration("A device serial is required".into()));
        }
        let merchant = self.resolve_merchant(&request).await?;
        let api_key = mint_api_key();
        let hash = hash_api_key(api_key.reveal())?;
        let device = self.db.upsert_device(merchant.id, request.serial.trim(), &hash).await?;
        info!("📟 Device '{}' registered [{}] for merchant '{}' [{}]",
            device.serial, device.id, merchant.name, merchant.id);
        Ok(RegisteredDevice { device_id: device.id, merchant_id: merchant.id, api_key })
    }

    async fn resolve_merchant(&self, request: &RegisterDevice) -> Result<Merchant, DeviceApiError> {
        match &request.binding {
            MerchantBinding::ActivationCode(code) => self
                .db
                .fetch_merchant_by_activation_code(code)
                .await?
                .ok_or_else(|| DeviceApiError::InvalidRegistration("Unknown activation code".into())),
            MerchantBinding::DirectToken { access_token, merchant_name } => {
                let fingerprint = token_fingerprint(access_token);
                if let Some(merchant) = self.db.fetch_merchant_by_fingerprint(&fingerprint).await? {
                    return Ok(merchant);
                }
                let name = merchant_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| format!("Merchant for {}", request.serial.trim()));
                let merchant = NewMerchant {
                    name,
                    access_token_enc: self.vault.encrypt_token(access_token)?,
                    token_fingerprint: fingerprint,
                    activation_code: None,
                    plan: DEFAULT_PLAN.to_string(),
                };
                Ok(self.db.insert_merchant(merchant).await?)
            },
        }
    }

    /// The device's merchant's most recent payments, newest first by provider timestamp.
    ///
    /// `limit` is clamped to `[1, MAX_PAYMENT_LIMIT]`; terminals poll shallowly.
    pub async fn recent_payments(&self, device: &Device, limit: Option<u32>) -> Result<Vec<Payment>, DeviceApiError> {
        if device.status == DeviceStatus::Blocked {
            return Err(DeviceApiError::Blocked);
        }
        let limit = limit.unwrap_or(DEFAULT_PAYMENT_LIMIT).clamp(1, MAX_PAYMENT_LIMIT);
        let payments = self.db.fetch_recent_payments(device.merchant_id, i64::from(limit)).await?;
        Ok(payments)
    }

    /// Liveness-only update. Authentication has already touched `last_seen`; this refreshes
    /// it again so a bare heartbeat and an authenticated read behave the same.
    pub async fn heartbeat(&self, device: &Device, ip: Option<&str>) -> Result<(), DeviceApiError> {
        self.db.update_device_liveness(device.id, ip, Utc::now()).await?;
        Ok(())
    }

    /// Records a payment the device observed locally (an on-device payment notification),
    /// rather than waiting for the next provider poll to pick it up.
    ///
    /// The record is stamped with the originating device and a server-minted `local_` external
    /// id, so it can never collide with a provider-assigned id and every push creates a fresh
    /// row. It carries the `notified` status, not `approved`: the terminal vouched for it, the
    /// provider has not. Blocked devices are refused, same as the payments feed.
    pub async fn record_notification(
        &self,
        device: &Device,
        amount: Money,
        payer_name: Option<String>,
    ) -> Result<Payment, DeviceApiError> {
        if device.status == DeviceStatus::Blocked {
            return Err(DeviceApiError::Blocked);
        }
        let record = NewPayment {
            external_id: mint_local_id(),
            device_id: Some(device.id),
            amount,
            payer_name,
            status: PAYMENT_STATUS_NOTIFIED.to_string(),
            paid_at: Utc::now(),
        };
        let result = self.db.insert_new_payments(device.merchant_id, &[record]).await?;
        let payment = result.inserted.into_iter().next().ok_or_else(|| {
            DeviceStoreError::DatabaseError("A freshly minted local payment id already existed".to_string())
        })?;
        info!(
            "📟 Device '{}' [{}] pushed a local payment of {} [{}]",
            device.serial, device.id, payment.amount, payment.external_id
        );
        Ok(payment)
    }

    // ------------------------------- administrative surface -------------------------------

    /// Creates a merchant from a raw provider token, encrypting it at rest.
    pub async fn create_merchant(
        &self,
        name: &str,
        access_token: &Secret<String>,
        activation_code: Option<String>,
        plan: Option<String>,
    ) -> Result<Merchant, DeviceApiError> {
        if name.trim().is_empty() {
            return Err(DeviceApiError::InvalidRegistration("A merchant name is required".into()));
        }
        let merchant = NewMerchant {
            name: name.trim().to_string(),
            access_token_enc: self.vault.encrypt_token(access_token)?,
            token_fingerprint: token_fingerprint(access_token),
            activation_code,
            plan: plan.unwrap_or_else(|| DEFAULT_PLAN.to_string()),
        };
        Ok(self.db.insert_merchant(merchant).await?)
    }

    /// Rotates a merchant's provider token. The next ingestion pass decrypts fresh, so the
    /// rotation takes effect on the next tick without a restart.
    pub async fn rotate_merchant_token(
        &self,
        merchant_id: i64,
        access_token: &Secret<String>,
    ) -> Result<(), DeviceApiError> {
        let encrypted = self.vault.encrypt_token(access_token)?;
        let fingerprint = token_fingerprint(access_token);
        self.db.update_merchant_token(merchant_id, &encrypted, &fingerprint).await?;
        Ok(())
    }

    /// Administrator-driven block/unblock.
    pub async fn set_device_status(&self, device_id: i64, status: DeviceStatus) -> Result<Device, DeviceApiError> {
        let device = self.db.set_device_status(device_id, status).await?;
        info!("📟 Device '{}' [{}] is now {}", device.serial, device.id, device.status);
        Ok(device)
    }
}

/// Mints a fresh 32-byte hex API key.
fn mint_api_key() -> Secret<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Secret::new(to_hex(&bytes))
}

/// Mints an external id for a device-pushed payment. The `local_` prefix keeps the namespace
/// disjoint from provider-assigned ids, which never carry it.
fn mint_local_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("local_{}", to_hex(&bytes))
}
