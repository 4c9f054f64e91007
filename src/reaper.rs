use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::Engine;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const COMPACT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that periodically advances time-expired reservations:
/// `pending` past its end date becomes `cancelled`, `confirmed` becomes
/// `finished` (which also tops up loyalty vouchers). The sweep is idempotent,
/// so racing a listing-triggered sweep is harmless.
pub async fn run_sweeper(engine: Arc<Engine>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let today = crate::local_today();
        let outcome = engine.sweep(today).await;
        if outcome.cancelled > 0 || outcome.finished > 0 {
            info!(
                "sweep: {} cancelled, {} finished, {} vouchers issued",
                outcome.cancelled, outcome.finished, outcome.vouchers_issued
            );
        } else {
            debug!("sweep: nothing due");
        }
    }
}

/// Background task that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match engine.compact_wal().await {
            Ok(()) => info!("compacted WAL after {appends} appends"),
            Err(e) => tracing::warn!("WAL compaction failed: {e}"),
        }
    }
}
