use thiserror::Error;

use crate::{
    traits::{DeviceStoreError, PaymentFeedError, PaymentStoreError},
    vault::VaultError,
};

/// Errors raised while polling. Everything except the initial merchant-list query is caught
/// at the merchant boundary by [`crate::IngestApi::poll_all_merchants`] and never propagates
/// to the scheduler.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Storage error during ingestion. {0}")]
    Store(#[from] PaymentStoreError),
    #[error("Could not decrypt the merchant's access token. {0}")]
    Vault(#[from] VaultError),
    #[error("Provider feed error. {0}")]
    Feed(#[from] PaymentFeedError),
}

#[derive(Debug, Error)]
pub enum DeviceApiError {
    #[error("Device not authorized")]
    Unauthorized,
    #[error("{}", crate::api::BLOCKED_DEVICE_MESSAGE)]
    Blocked,
    #[error("Invalid registration request. {0}")]
    InvalidRegistration(String),
    #[error("The record was not found. {0}")]
    NotFound(String),
    #[error("Storage error in the device gateway. {0}")]
    Store(DeviceStoreError),
    #[error("Vault error in the device gateway. {0}")]
    Vault(#[from] VaultError),
}

impl From<DeviceStoreError> for DeviceApiError {
    fn from(e: DeviceStoreError) -> Self {
        match e {
            DeviceStoreError::NotFound(s) => Self::NotFound(s),
            other => Self::Store(other),
        }
    }
}

impl From<PaymentStoreError> for DeviceApiError {
    fn from(e: PaymentStoreError) -> Self {
        let PaymentStoreError::DatabaseError(msg) = e;
        Self::Store(DeviceStoreError::DatabaseError(msg))
    }
}
