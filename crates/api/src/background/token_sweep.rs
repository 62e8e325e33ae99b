//! Periodic deletion of expired verification tokens.
//!
//! Pure cleanup: redemption re-checks expiry on every attempt, so a missed or
//! failed sweep never lets an expired token through.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use verity_core::clock::Clock;
use verity_db::store::TokenStore;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Run the sweep loop until `cancel` fires.
///
/// The first sweep runs immediately. Store failures are logged and the loop
/// carries on.
pub async fn run(
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Token sweep started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Token sweep stopping");
                break;
            }
            _ = ticker.tick() => {
                match tokens.delete_expired_before(clock.now()).await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Token sweep: purged expired tokens");
                    }
                    Ok(_) => tracing::debug!("Token sweep: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Token sweep: cleanup failed"),
                }
            }
        }
    }
}
