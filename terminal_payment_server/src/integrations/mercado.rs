//! Adapts the Mercado API client to the engine's [`PaymentFeed`] contract, so the engine
//! stays free of provider-specific JSON.
use chrono::{DateTime, Utc};
use mercado_tools::{MercadoApi, MercadoApiError, NormalizedPayment};
use terminal_payment_engine::{
    db_types::NewPayment,
    traits::{PaymentFeed, PaymentFeedError},
};
use tps_common::{Money, Secret};

#[derive(Clone)]
pub struct MercadoFeed {
    api: MercadoApi,
}

impl MercadoFeed {
    pub fn new(api: MercadoApi) -> Self {
        Self { api }
    }
}

impl PaymentFeed for MercadoFeed {
    async fn fetch_recent(
        &self,
        access_token: &Secret<String>,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<NewPayment>, PaymentFeedError> {
        let records = self
            .api
            .search_recent_payments(access_token, since, limit)
            .await
            .map_err(feed_error)?;
        Ok(records.into_iter().map(new_payment_from_record).collect())
    }
}

fn new_payment_from_record(record: NormalizedPayment) -> NewPayment {
    NewPayment {
        external_id: record.external_id,
        device_id: None,
        amount: Money::from_decimal(record.amount),
        payer_name: record.payer_name,
        status: record.status,
        paid_at: record.created_at,
    }
}

fn feed_error(e: MercadoApiError) -> PaymentFeedError {
    match e {
        MercadoApiError::Timeout => PaymentFeedError::Timeout,
        MercadoApiError::QueryError { status, message } => PaymentFeedError::Upstream { status, body: message },
        other => PaymentFeedError::Other(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_convert_with_cent_rounding() {
        let record = NormalizedPayment {
            external_id: "12345".to_string(),
            status: "approved".to_string(),
            amount: 150.55,
            payer_name: Some("Ana".to_string()),
            created_at: Utc::now(),
        };
        let payment = new_payment_from_record(record);
        assert_eq!(payment.external_id, "12345");
        assert_eq!(payment.amount, Money::from_cents(15_055));
        assert!(payment.is_approved());
    }
}
