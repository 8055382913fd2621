//! `SqliteDatabase` is the concrete storage backend for the terminal payment engine.
//!
//! It implements both storage traits over a single connection pool. Read paths acquire a
//! pooled connection; the batch-commit path opens one transaction per merchant batch so that
//! a mid-batch failure rolls the whole merchant back.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::{
    db::{devices, merchants, new_pool, payments},
    MIGRATOR,
};
use crate::{
    db_types::{Device, DeviceStatus, Merchant, NewMerchant, NewPayment, Payment},
    traits::{DeviceManagement, DeviceStoreError, InsertBatchResult, PaymentStore, PaymentStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await
    }
}

impl PaymentStore for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_merchants(&self) -> Result<Vec<Merchant>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchants = merchants::fetch_all(&mut conn).await?;
        Ok(merchants)
    }

    async fn insert_new_payments(
        &self,
        merchant_id: i64,
        new_payments: &[NewPayment],
    ) -> Result<InsertBatchResult, PaymentStoreError> {
        let mut result = InsertBatchResult::default();
        if new_payments.is_empty() {
            return Ok(result);
        }
        let mut tx = self.pool.begin().await?;
        for payment in new_payments {
            match payments::idempotent_insert(merchant_id, payment, &mut *tx).await? {
                Some(saved) => {
                    debug!("🗃️ Payment {} for merchant {merchant_id} saved with id {}", saved.external_id, saved.id);
                    result.inserted.push(saved);
                },
                None => result.duplicates += 1,
            }
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn fetch_recent_payments(&self, merchant_id: i64, limit: i64) -> Result<Vec<Payment>, PaymentStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_recent_for_merchant(merchant_id, limit, &mut conn).await?;
        Ok(payments)
    }
}

impl DeviceManagement for SqliteDatabase {
    async fn fetch_device_by_id(&self, id: i64) -> Result<Option<Device>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let device = devices::fetch_by_id(id, &mut conn).await?;
        Ok(device)
    }

    async fn fetch_device_by_serial(&self, serial: &str) -> Result<Option<Device>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let device = devices::fetch_by_serial(serial, &mut conn).await?;
        Ok(device)
    }

    async fn fetch_devices(&self) -> Result<Vec<Device>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let devices = devices::fetch_all(&mut conn).await?;
        Ok(devices)
    }

    async fn upsert_device(
        &self,
        merchant_id: i64,
        serial: &str,
        api_key_hash: &str,
    ) -> Result<Device, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let device = devices::upsert(merchant_id, serial, api_key_hash, &mut conn).await?;
        debug!("🗃️ Device {serial} registered with id {} for merchant {}", device.id, device.merchant_id);
        Ok(device)
    }

    async fn update_device_liveness(
        &self,
        device_id: i64,
        ip: Option<&str>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        devices::update_liveness(device_id, ip, seen_at, &mut conn).await?;
        Ok(())
    }

    async fn set_device_status(&self, device_id: i64, status: DeviceStatus) -> Result<Device, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let device = devices::set_status(device_id, status, &mut conn).await?;
        debug!("🗃️ Device {device_id} status set to {status}");
        Ok(device)
    }

    async fn fetch_merchant_by_id(&self, id: i64) -> Result<Option<Merchant>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_by_id(id, &mut conn).await?;
        Ok(merchant)
    }

    async fn fetch_merchant_by_activation_code(&self, code: &str) -> Result<Option<Merchant>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_by_activation_code(code, &mut conn).await?;
        Ok(merchant)
    }

    async fn fetch_merchant_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Merchant>, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_by_fingerprint(fingerprint, &mut conn).await?;
        Ok(merchant)
    }

    async fn insert_merchant(&self, merchant: NewMerchant) -> Result<Merchant, DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::insert(merchant, &mut conn).await?;
        debug!("🗃️ Merchant '{}' created with id {}", merchant.name, merchant.id);
        Ok(merchant)
    }

    async fn update_merchant_token(
        &self,
        merchant_id: i64,
        access_token_enc: &str,
        fingerprint: &str,
    ) -> Result<(), DeviceStoreError> {
        let mut conn = self.pool.acquire().await?;
        merchants::update_token(merchant_id, access_token_enc, fingerprint, &mut conn).await?;
        debug!("🗃️ Merchant {merchant_id} token rotated");
        Ok(())
    }
}
