use std::sync::Arc;

use chrono::{Duration, Utc};
use log::*;
use tokio::sync::Mutex;
use tps_common::Money;

use crate::{
    api::errors::IngestError,
    db_types::{Merchant, NewPayment},
    traits::{PaymentFeed, PaymentStore},
    vault::Vault,
};

pub const DEFAULT_LOOKBACK_HOURS: i64 = 3;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// How far back each poll looks. This is a shallow "recent window" feed for terminals,
    /// not a history sync.
    pub lookback: Duration,
    /// Page size for the provider call.
    pub page_size: u32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { lookback: Duration::hours(DEFAULT_LOOKBACK_HOURS), page_size: DEFAULT_PAGE_SIZE }
    }
}

/// The result of one full ingestion pass over all merchants.
#[derive(Debug, Default, Clone)]
pub struct IngestSummary {
    pub merchants_polled: usize,
    /// Merchants skipped because they have no token configured.
    pub merchants_skipped: usize,
    /// Merchants whose poll failed this cycle (bad token, provider error, storage error).
    pub merchants_failed: usize,
    pub new_payments: usize,
    /// Records the provider re-returned that were already in storage. Expected steady state,
    /// not failures.
    pub duplicates: usize,
    pub total_amount: Money,
}

/// What one merchant's poll produced.
#[derive(Debug, Clone)]
pub struct MerchantPollOutcome {
    pub new_payments: usize,
    pub duplicates: usize,
    pub amount: Money,
}

/// The outcome of requesting an ingestion pass.
#[derive(Debug)]
pub enum PassOutcome {
    Completed(IngestSummary),
    /// Another pass (timer-driven or manual) is still in flight; this request was skipped,
    /// not queued.
    AlreadyRunning,
}

/// The multi-tenant ingestion engine.
///
/// One instance is shared between the interval worker and the manual trigger route; the
/// internal pass guard guarantees at most one ingestion pass in flight at a time across both
/// entry points.
#[derive(Clone)]
pub struct IngestApi<B, F>
where
    B: PaymentStore,
    F: PaymentFeed,
{
    db: B,
    feed: F,
    vault: Vault,
    options: IngestOptions,
    pass_guard: Arc<Mutex<()>>,
}

impl<B, F> IngestApi<B, F>
where
    B: PaymentStore,
    F: PaymentFeed,
{
    pub fn new(db: B, feed: F, vault: Vault, options: IngestOptions) -> Self {
        Self { db, feed, vault, options, pass_guard: Arc::new(Mutex::new(())) }
    }

    /// Runs one ingestion pass over every merchant.
    ///
    /// Per-merchant failures are logged and counted, and never interrupt the pass; merchants
    /// share no fate. The only error this returns is a failure to list the merchants at all.
    pub async fn poll_all_merchants(&self) -> Result<PassOutcome, IngestError> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            info!("💰 An ingestion pass is already in flight. Skipping this one.");
            return Ok(PassOutcome::AlreadyRunning);
        };
        let merchants = self.db.fetch_merchants().await?;
        let mut summary = IngestSummary::default();
        for merchant in &merchants {
            match self.poll_merchant(merchant).await {
                Ok(Some(outcome)) => {
                    summary.merchants_polled += 1;
                    summary.new_payments += outcome.new_payments;
                    summary.duplicates += outcome.duplicates;
                    summary.total_amount = summary.total_amount + outcome.amount;
                },
                Ok(None) => summary.merchants_skipped += 1,
                Err(e) => {
                    summary.merchants_failed += 1;
                    warn!("💰 Poll failed for merchant '{}' [{}]. Continuing with the next one. {e}",
                        merchant.name, merchant.id);
                },
            }
        }
        Ok(PassOutcome::Completed(summary))
    }

    /// Polls a single merchant. Returns `None` when the merchant has no token configured.
    ///
    /// The token is decrypted fresh on every pass so that a rotation takes effect on the next
    /// tick; plaintext is never cached across ticks.
    pub async fn poll_merchant(&self, merchant: &Merchant) -> Result<Option<MerchantPollOutcome>, IngestError> {
        let Some(token_enc) = merchant.access_token_enc.as_deref() else {
            trace!("💰 Merchant '{}' has no access token configured. Skipping.", merchant.name);
            return Ok(None);
        };
        let access_token = self.vault.decrypt_token(token_enc)?;
        let since = Utc::now() - self.options.lookback;
        let records = self.feed.fetch_recent(&access_token, since, self.options.page_size).await?;
        let fetched = records.len();
        // Only settled, successful inbound movements are persisted. The terminal-facing
        // question is "did money arrive", so pending/rejected/refunded records are excluded.
        let approved: Vec<NewPayment> = records.into_iter().filter(NewPayment::is_approved).collect();
        let result = self.db.insert_new_payments(merchant.id, &approved).await?;
        let outcome = MerchantPollOutcome {
            new_payments: result.inserted.len(),
            duplicates: result.duplicates,
            amount: result.inserted_total(),
        };
        if outcome.new_payments > 0 {
            info!(
                "💰 Merchant '{}' [{}]: {} new payment(s) totalling {} ({} fetched, {} duplicate(s))",
                merchant.name, merchant.id, outcome.new_payments, outcome.amount, fetched, outcome.duplicates
            );
        } else {
            debug!(
                "💰 Merchant '{}' [{}]: nothing new ({} fetched, {} duplicate(s))",
                merchant.name, merchant.id, fetched, outcome.duplicates
            );
        }
        Ok(Some(outcome))
    }
}
