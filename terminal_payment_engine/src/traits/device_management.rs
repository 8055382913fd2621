use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{Device, DeviceStatus, Merchant, NewMerchant};

#[derive(Debug, Error)]
pub enum DeviceStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The record was not found. {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for DeviceStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Storage contract for the device gateway and the administrative rows it consumes.
#[allow(async_fn_in_trait)]
pub trait DeviceManagement: Clone {
    async fn fetch_device_by_id(&self, id: i64) -> Result<Option<Device>, DeviceStoreError>;

    async fn fetch_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DeviceStoreError>;

    /// The whole fleet. Only used by the no-serial-hint authentication fallback.
    async fn fetch_devices(&self) -> Result<Vec<Device>, DeviceStoreError>;

    /// Creates the device, or, if the serial already exists, rotates its credential hash and
    /// forces its status back to [`DeviceStatus::Active`]. The merchant binding of an existing
    /// serial is never changed by re-registration.
    async fn upsert_device(&self, merchant_id: i64, serial: &str, api_key_hash: &str)
        -> Result<Device, DeviceStoreError>;

    /// Records that the device was seen: `last_seen` and, when known, `last_ip`.
    async fn update_device_liveness(
        &self,
        device_id: i64,
        ip: Option<&str>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), DeviceStoreError>;

    /// Administrator-driven block/unblock. Returns the updated device.
    async fn set_device_status(&self, device_id: i64, status: DeviceStatus) -> Result<Device, DeviceStoreError>;

    async fn fetch_merchant_by_id(&self, id: i64) -> Result<Option<Merchant>, DeviceStoreError>;

    async fn fetch_merchant_by_activation_code(&self, code: &str) -> Result<Option<Merchant>, DeviceStoreError>;

    async fn fetch_merchant_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Merchant>, DeviceStoreError>;

    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, DeviceStoreError>;

    /// Token rotation: overwrites the encrypted token and its fingerprint in place.
    async fn update_merchant_token(
        &self,
        merchant_id: i64,
        access_token_enc: &str,
        fingerprint: &str,
    ) -> Result<(), DeviceStoreError>;
}
