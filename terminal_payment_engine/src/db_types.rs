use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use tps_common::Money;

//--------------------------------------     Merchant       ----------------------------------------------------------
/// A tenant whose provider account is polled for payments.
///
/// The provider access token is only ever stored encrypted (`access_token_enc`); the
/// `token_fingerprint` is a one-way digest of the plaintext used to recognise an already
/// registered token during device self-registration. Deleting a merchant cascades to its
/// devices and payments.
#[derive(Debug, Clone, FromRow)]
pub struct Merchant {
    pub id: i64,
    pub name: String,
    pub access_token_enc: Option<String>,
    pub token_fingerprint: Option<String>,
    /// Pre-shared code that lets a device bind to this merchant without handling the provider
    /// token directly.
    pub activation_code: Option<String>,
    pub plan: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMerchant {
    pub name: String,
    pub access_token_enc: String,
    pub token_fingerprint: String,
    pub activation_code: Option<String>,
    pub plan: String,
}

//--------------------------------------   DeviceStatus     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// The device may read its merchant's payment feed.
    Active,
    /// An administrator has blocked the device. It can still authenticate, but the payment
    /// feed is withheld until it is unblocked or re-provisioned.
    Blocked,
}

impl Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::Active => write!(f, "Active"),
            DeviceStatus::Blocked => write!(f, "Blocked"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid device status: {0}")]
pub struct ConversionError(String);

impl FromStr for DeviceStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Blocked" => Ok(Self::Blocked),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for DeviceStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid device status: {value}. But this conversion cannot fail. Defaulting to Blocked");
            DeviceStatus::Blocked
        })
    }
}

//--------------------------------------      Device        ----------------------------------------------------------
/// A field terminal belonging to exactly one merchant.
///
/// The API key is the device's only credential; only its argon2 hash is stored here. The
/// serial number is globally unique across merchants.
#[derive(Debug, Clone, FromRow)]
pub struct Device {
    pub id: i64,
    pub merchant_id: i64,
    pub serial: String,
    pub api_key_hash: String,
    pub status: DeviceStatus,
    pub last_seen: Option<DateTime<Utc>>,
    pub last_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      Payment       ----------------------------------------------------------
/// The status every polled payment carries. Only settled, successful inbound movements make
/// it past the ingestion filter.
pub const PAYMENT_STATUS_APPROVED: &str = "approved";

/// The status of a payment pushed by a device that observed it locally, as opposed to one
/// confirmed by the provider.
pub const PAYMENT_STATUS_NOTIFIED: &str = "notified";

/// A single ingested monetary event. Append-only: the engine never updates or deletes these.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// Provider-assigned identifier; the dedup key, unique per merchant.
    pub external_id: String,
    pub merchant_id: i64,
    /// The originating device, for directly-pushed client events. Polled records have none.
    pub device_id: Option<i64>,
    pub amount: Money,
    pub payer_name: Option<String>,
    pub status: String,
    /// When the provider says the money moved.
    pub paid_at: DateTime<Utc>,
    /// When this row was ingested locally.
    pub created_at: DateTime<Utc>,
}

/// A payment record as produced by a [`crate::traits::PaymentFeed`], before it has been
/// deduplicated and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub external_id: String,
    pub device_id: Option<i64>,
    pub amount: Money,
    pub payer_name: Option<String>,
    /// Lowercased, provider-normalized status. Anything other than
    /// [`PAYMENT_STATUS_APPROVED`] is filtered out by the ingestion engine.
    pub status: String,
    pub paid_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn is_approved(&self) -> bool {
        self.status == PAYMENT_STATUS_APPROVED
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn device_status_round_trips() {
        assert_eq!("Active".parse::<DeviceStatus>().unwrap(), DeviceStatus::Active);
        assert_eq!(DeviceStatus::Blocked.to_string(), "Blocked");
        assert!("active".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn unknown_status_from_db_defaults_to_blocked() {
        assert_eq!(DeviceStatus::from("garbage".to_string()), DeviceStatus::Blocked);
    }
}
