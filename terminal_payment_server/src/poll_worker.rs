use log::*;
use terminal_payment_engine::{IngestApi, PassOutcome, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::mercado::MercadoFeed;

/// Starts the background ingestion worker. Do not await the returned JoinHandle, as it will
/// run indefinitely.
///
/// The worker shares its [`IngestApi`] instance with the manual `/poll` route, so the
/// single-flight guard covers both: a tick that fires while a manual pass is still running is
/// skipped, never queued.
pub fn start_poll_worker(api: IngestApi<SqliteDatabase, MercadoFeed>, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        info!("🕰️ Payment ingestion worker started (every {}s)", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running ingestion pass");
            match api.poll_all_merchants().await {
                Ok(PassOutcome::Completed(summary)) => {
                    if summary.new_payments > 0 || summary.merchants_failed > 0 {
                        info!(
                            "🕰️ Ingestion pass complete. {} merchant(s) polled, {} skipped, {} failed. {} new \
                             payment(s) totalling {}, {} duplicate(s).",
                            summary.merchants_polled,
                            summary.merchants_skipped,
                            summary.merchants_failed,
                            summary.new_payments,
                            summary.total_amount,
                            summary.duplicates
                        );
                    } else {
                        debug!(
                            "🕰️ Ingestion pass complete. Nothing new. {} merchant(s) polled, {} skipped.",
                            summary.merchants_polled, summary.merchants_skipped
                        );
                    }
                },
                Ok(PassOutcome::AlreadyRunning) => {
                    debug!("🕰️ A pass was already in flight at tick time. Skipped.");
                },
                Err(e) => {
                    error!("🕰️ Error running ingestion pass: {e}");
                },
            }
        }
    })
}
