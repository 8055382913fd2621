use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The canonical record shape that every provider endpoint variant is normalized into.
///
/// Records that arrive without an id cannot be deduplicated safely and are dropped during
/// normalization; they never reach this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPayment {
    /// Provider-assigned identifier. Unique per merchant-visible record; used as the dedup key.
    pub external_id: String,
    /// Lowercased provider status. Paid-equivalent statuses from the non-payment endpoints are
    /// folded into `approved` so callers only deal with one vocabulary.
    pub status: String,
    /// Decimal amount as reported by the provider. Missing amounts default to 0.
    pub amount: f64,
    pub payer_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which provider report endpoint to poll.
///
/// Mercado Pago has shipped at least four incompatible shapes for "recent money movements"
/// across API versions. The choice is a pluggable strategy so that switching endpoints is a
/// configuration change, not a code change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MercadoEndpoint {
    #[default]
    PaymentsSearch,
    AccountMovements,
    MerchantOrders,
    AccountActivities,
}

#[derive(Debug, Clone, Error)]
#[error("Unknown provider endpoint: {0}")]
pub struct UnknownEndpoint(String);

impl FromStr for MercadoEndpoint {
    type Err = UnknownEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payments_search" | "payments" => Ok(Self::PaymentsSearch),
            "account_movements" | "movements" => Ok(Self::AccountMovements),
            "merchant_orders" | "orders" => Ok(Self::MerchantOrders),
            "account_activities" | "activities" => Ok(Self::AccountActivities),
            other => Err(UnknownEndpoint(other.to_string())),
        }
    }
}

impl Display for MercadoEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PaymentsSearch => "payments_search",
            Self::AccountMovements => "account_movements",
            Self::MerchantOrders => "merchant_orders",
            Self::AccountActivities => "account_activities",
        };
        f.write_str(s)
    }
}

impl MercadoEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::PaymentsSearch => "/v1/payments/search",
            Self::AccountMovements => "/v1/account/movements/search",
            Self::MerchantOrders => "/merchant_orders/search",
            Self::AccountActivities => "/v1/account/activities/search",
        }
    }

    /// The key under which this endpoint variant nests its record array.
    fn results_key(&self) -> &'static str {
        match self {
            Self::MerchantOrders => "elements",
            _ => "results",
        }
    }

    /// Maps one page of provider JSON into canonical records.
    ///
    /// Unknown fields are ignored and records without an id are dropped with a warning, so a
    /// partially-garbled page degrades to fewer records instead of a failed poll.
    pub fn normalize(&self, body: &Value) -> Vec<NormalizedPayment> {
        let records = body
            .get(self.results_key())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        records.iter().filter_map(|r| self.normalize_record(r)).collect()
    }

    fn normalize_record(&self, record: &Value) -> Option<NormalizedPayment> {
        let external_id = match json_id(record, "id") {
            Some(id) => id,
            None => {
                warn!("Dropping provider record with no id from the {self} endpoint: {record}");
                return None;
            },
        };
        let (status, amount, payer_name, created_at) = match self {
            Self::PaymentsSearch => (
                json_str(record, "status"),
                record["transaction_amount"].as_f64(),
                json_str(record, "payer.first_name"),
                json_str(record, "date_created"),
            ),
            Self::AccountMovements => (
                json_str(record, "status"),
                record["amount"].as_f64(),
                json_str(record, "counterpart.name"),
                json_str(record, "date_created"),
            ),
            Self::MerchantOrders => (
                // Merchant orders report "paid" where the payments API says "approved".
                json_str(record, "order_status").map(|s| if s == "paid" { "approved".into() } else { s }),
                record["paid_amount"].as_f64(),
                json_str(record, "payer.nickname"),
                json_str(record, "date_created"),
            ),
            Self::AccountActivities => (
                json_str(record, "status"),
                record["amount"]["value"].as_f64(),
                json_str(record, "description"),
                json_str(record, "date"),
            ),
        };
        let created_at = created_at
            .and_then(|ts| ts.parse::<DateTime<Utc>>().ok())
            .unwrap_or_else(|| {
                debug!("Provider record {external_id} has no parseable timestamp. Using the current time.");
                Utc::now()
            });
        Some(NormalizedPayment {
            external_id,
            status: status.unwrap_or_default().to_ascii_lowercase(),
            amount: amount.unwrap_or_default(),
            payer_name,
            created_at,
        })
    }
}

/// Provider ids arrive as JSON numbers on some endpoints and strings on others.
fn json_id(record: &Value, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Fetch a (possibly dotted-path) string field from a record.
fn json_str(record: &Value, path: &str) -> Option<String> {
    let mut current = record;
    for key in path.split('.') {
        current = current.get(key)?;
    }
    current.as_str().map(String::from)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalizes_the_payments_search_shape() {
        let body = json!({
            "results": [
                {
                    "id": 12345,
                    "status": "approved",
                    "transaction_amount": 150.0,
                    "payer": { "first_name": "Ana" },
                    "date_created": "2024-06-01T12:00:00Z"
                },
                { "id": "67890", "status": "PENDING", "transaction_amount": 10.5 }
            ]
        });
        let records = MercadoEndpoint::PaymentsSearch.normalize(&body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].external_id, "12345");
        assert_eq!(records[0].status, "approved");
        assert_eq!(records[0].amount, 150.0);
        assert_eq!(records[0].payer_name.as_deref(), Some("Ana"));
        assert_eq!(records[1].status, "pending");
        assert_eq!(records[1].payer_name, None);
    }

    #[test]
    fn drops_records_without_an_id() {
        let body = json!({
            "results": [
                { "status": "approved", "transaction_amount": 99.0 },
                { "id": "keep-me", "status": "approved", "transaction_amount": 1.0 }
            ]
        });
        let records = MercadoEndpoint::PaymentsSearch.normalize(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id, "keep-me");
    }

    #[test]
    fn merchant_orders_fold_paid_into_approved() {
        let body = json!({
            "elements": [
                {
                    "id": 42,
                    "order_status": "paid",
                    "paid_amount": 20.0,
                    "payer": { "nickname": "bruno" },
                    "date_created": "2024-06-01T09:30:00Z"
                }
            ]
        });
        let records = MercadoEndpoint::MerchantOrders.normalize(&body);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "approved");
        assert_eq!(records[0].payer_name.as_deref(), Some("bruno"));
    }

    #[test]
    fn missing_amount_defaults_to_zero() {
        let body = json!({ "results": [{ "id": "a1", "status": "approved" }] });
        let records = MercadoEndpoint::PaymentsSearch.normalize(&body);
        assert_eq!(records[0].amount, 0.0);
    }

    #[test]
    fn endpoint_round_trips_through_strings() {
        for ep in [
            MercadoEndpoint::PaymentsSearch,
            MercadoEndpoint::AccountMovements,
            MercadoEndpoint::MerchantOrders,
            MercadoEndpoint::AccountActivities,
        ] {
            assert_eq!(ep.to_string().parse::<MercadoEndpoint>().unwrap(), ep);
        }
        assert!("not-an-endpoint".parse::<MercadoEndpoint>().is_err());
    }
}
