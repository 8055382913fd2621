use thiserror::Error;
use tps_common::Money;

use crate::db_types::{Merchant, NewPayment, Payment};

#[derive(Debug, Error)]
pub enum PaymentStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PaymentStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// The result of committing one merchant's batch. Duplicates are an expected steady-state
/// outcome of polling an eventually-duplicated feed, not failures.
#[derive(Debug, Default)]
pub struct InsertBatchResult {
    pub inserted: Vec<Payment>,
    pub duplicates: usize,
}

impl InsertBatchResult {
    pub fn inserted_total(&self) -> Money {
        self.inserted.iter().map(|p| p.amount).sum()
    }
}

/// Durable storage for the ingestion side of the engine.
#[allow(async_fn_in_trait)]
pub trait PaymentStore: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Every merchant in the system, whether or not it has a token configured.
    async fn fetch_merchants(&self) -> Result<Vec<Merchant>, PaymentStoreError>;

    /// Commits a batch of payments for one merchant in a single transaction.
    ///
    /// Records whose `(merchant_id, external_id)` already exist are skipped, not errors.
    /// Either every new record in the batch lands, or none do.
    async fn insert_new_payments(
        &self,
        merchant_id: i64,
        payments: &[NewPayment],
    ) -> Result<InsertBatchResult, PaymentStoreError>;

    /// The newest `limit` payments for a merchant, ordered by provider timestamp descending.
    async fn fetch_recent_payments(&self, merchant_id: i64, limit: i64) -> Result<Vec<Payment>, PaymentStoreError>;
}
