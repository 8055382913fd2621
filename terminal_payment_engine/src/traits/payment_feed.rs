use chrono::{DateTime, Utc};
use thiserror::Error;
use tps_common::Secret;

use crate::db_types::NewPayment;

#[derive(Debug, Error)]
pub enum PaymentFeedError {
    #[error("The provider did not respond within the deadline")]
    Timeout,
    #[error("Provider request failed with status {status}. {body}")]
    Upstream { status: u16, body: String },
    #[error("Provider request failed. {0}")]
    Other(String),
}

/// One outbound call to the payment provider for a single merchant's access token.
///
/// Implementations must not retry internally; retry cadence belongs to the polling scheduler.
/// Records the provider returns without a usable external id must be dropped before they
/// reach the engine, since they cannot be deduplicated safely.
#[allow(async_fn_in_trait)]
pub trait PaymentFeed: Clone {
    /// The most recent records for the account behind `access_token`, bounded by the `since`
    /// window and the `limit` page size, newest first.
    async fn fetch_recent(
        &self,
        access_token: &Secret<String>,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<NewPayment>, PaymentFeedError>;
}
