//! Stale-job reaper.
//!
//! Jobs stuck in `working` past the staleness threshold are presumed
//! abandoned (worker crash, host loss, hung parse) and are requeued with an
//! incremented attempt count and a `[reset-stale]` marker appended to
//! `last_error`. Combined with the attempt cap, repeated staleness converges
//! to `failed`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::queue::JobQueue;

pub async fn run_reaper(
    queue: JobQueue,
    interval: Duration,
    stale_after: Duration,
    shutdown: CancellationToken,
) {
    info!(
        interval_secs = interval.as_secs(),
        stale_after_secs = stale_after.as_secs(),
        "starting stale job reaper"
    );

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("stale job reaper stopped");
                break;
            }
            _ = ticker.tick() => {
                match queue.reset_stale(stale_after).await {
                    Ok(0) => {}
                    Ok(count) => warn!(count, "reset stale job(s) back to queued"),
                    Err(e) => error!(error = %e, "failed to reset stale jobs"),
                }
            }
        }
    }
}
