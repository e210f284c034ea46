//! Draft retention sweep.
//!
//! Unpromoted drafts whose gating transaction failed, or whose retention
//! deadline passed without resolution, are dropped periodically. Promoted
//! drafts are never swept.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::ports::DraftStore;

/// Runs the background sweep loop. Never returns; spawn it.
pub async fn run_sweeper(drafts: Arc<dyn DraftStore>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "draft retention sweeper started");

    loop {
        match drafts.purge_stale(Utc::now()).await {
            Ok(0) => debug!("sweep found nothing to purge"),
            Ok(purged) => info!(purged, "purged stale registration drafts"),
            Err(err) => error!("draft sweep failed: {}", err),
        }

        sleep(interval).await;
    }
}
