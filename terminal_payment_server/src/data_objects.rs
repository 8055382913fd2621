use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terminal_payment_engine::{
    db_types::{Device, Merchant, Payment},
    IngestSummary,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The registration request. Exactly one of `activation_code` or `access_token` must be
/// supplied; the route rejects ambiguous requests rather than guessing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub serial: String,
    #[serde(default)]
    pub activation_code: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub merchant_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceResponse {
    pub device_id: i64,
    pub merchant_id: i64,
    /// The plaintext key, returned here and never again.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusResponse {
    pub serial: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceStatusResponse {
    pub fn from_device(device: &Device, message: Option<String>) -> Self {
        Self { serial: device.serial.clone(), status: device.status.to_string(), message, last_seen: device.last_seen }
    }
}

/// The payment record as a terminal sees it. Amounts go over the wire as decimal currency
/// units, matching what the provider reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: String,
    pub amount: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        Self {
            id: p.external_id,
            amount: p.amount.to_decimal(),
            status: p.status,
            payer_name: p.payer_name,
            timestamp: p.paid_at,
        }
    }
}

/// A payment the terminal observed locally and is pushing ahead of the provider poll. The
/// server mints the payment id; the device only reports what it saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyPaymentRequest {
    /// Decimal currency units, as displayed on the terminal.
    pub amount: f64,
    #[serde(default)]
    pub payer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentListParams {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMerchantRequest {
    pub name: String,
    pub access_token: String,
    #[serde(default)]
    pub activation_code: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// The merchant as the operator surface reports it. Tokens, encrypted or not, never appear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantResponse {
    pub id: i64,
    pub name: String,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Merchant> for MerchantResponse {
    fn from(m: Merchant) -> Self {
        Self { id: m.id, name: m.name, plan: m.plan, activation_code: m.activation_code, created_at: m.created_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotateTokenRequest {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSummaryResponse {
    pub merchants_polled: usize,
    pub merchants_skipped: usize,
    pub merchants_failed: usize,
    pub new_payments: usize,
    pub duplicates: usize,
    pub total_amount: f64,
}

impl From<IngestSummary> for PollSummaryResponse {
    fn from(s: IngestSummary) -> Self {
        Self {
            merchants_polled: s.merchants_polled,
            merchants_skipped: s.merchants_skipped,
            merchants_failed: s.merchants_failed,
            new_payments: s.new_payments,
            duplicates: s.duplicates,
            total_amount: s.total_amount.to_decimal(),
        }
    }
}
