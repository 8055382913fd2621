use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use log::*;
use reqwest::Client;
use serde_json::Value;
use tps_common::Secret;

use crate::{config::MercadoConfig, data_objects::NormalizedPayment, error::MercadoApiError};

/// A handle to the provider's payments API for a single call site.
///
/// Access tokens are per-merchant and supplied per call, so one `MercadoApi` instance serves
/// every merchant in the fleet. The underlying [`Client`] carries the request deadline; this
/// client never retries, since retry cadence belongs to the polling scheduler.
#[derive(Clone)]
pub struct MercadoApi {
    config: MercadoConfig,
    client: Arc<Client>,
}

impl MercadoApi {
    pub fn new(config: MercadoConfig) -> Result<Self, MercadoApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MercadoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Fetches the most recent payment records for the account behind `access_token`.
    ///
    /// This is a shallow "recent window" feed, not a history sync: `since` bounds the time
    /// window and `limit` the page size. Responses are normalized by the configured endpoint
    /// strategy before being returned.
    pub async fn search_recent_payments(
        &self,
        access_token: &Secret<String>,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<NormalizedPayment>, MercadoApiError> {
        let url = format!("{}{}", self.config.base_url, self.config.endpoint.path());
        let begin_date = since.to_rfc3339_opts(SecondsFormat::Millis, true);
        let limit = limit.to_string();
        let params = [
            ("sort", "date_created"),
            ("criteria", "desc"),
            ("range", "date_created"),
            ("begin_date", begin_date.as_str()),
            ("limit", limit.as_str()),
        ];
        trace!("Polling provider endpoint {url}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token.reveal())
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MercadoApiError::Timeout
                } else {
                    MercadoApiError::RequestError(e.to_string())
                }
            })?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MercadoApiError::RequestError(e.to_string()))?;
            return Err(MercadoApiError::QueryError { status, message });
        }
        let body = response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                MercadoApiError::Timeout
            } else {
                MercadoApiError::JsonError(e.to_string())
            }
        })?;
        let records = self.config.endpoint.normalize(&body);
        trace!("Provider returned {} usable records from the {} endpoint", records.len(), self.config.endpoint);
        Ok(records)
    }
}
