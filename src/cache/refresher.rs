use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::CacheError;
use crate::utils::format_timestamp;

use super::RefreshableCache;

/// Periodically refresh the cache so foreground requests usually hit a fresh snapshot.
///
/// Each tick is a no-op while the snapshot is fresh or a fetch is already running.
/// The task exits once `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_refresher(
    cache: RefreshableCache,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Background refresher running every {period:?}");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if shutdown_requested(changed, &shutdown) {
                        break;
                    }
                    continue;
                }
            }

            // The fetch itself runs in its own task, so dropping this future
            // on shutdown leaves it to finish or time out on its own.
            tokio::select! {
                _ = refresh_if_due(&cache) => {}
                changed = shutdown.changed() => {
                    if shutdown_requested(changed, &shutdown) {
                        break;
                    }
                }
            }
        }

        info!("Background refresher stopped");
    })
}

fn shutdown_requested(
    changed: Result<(), watch::error::RecvError>,
    shutdown: &watch::Receiver<bool>,
) -> bool {
    changed.is_err() || *shutdown.borrow()
}

/// Run one refresher tick. Returns whether a refresh was attempted.
pub async fn refresh_if_due(cache: &RefreshableCache) -> bool {
    let now = Utc::now();
    let status = cache.cache_status(now);
    if status.is_fresh || status.fetch_in_progress {
        debug!(
            "Refresher tick skipped (fresh: {}, in flight: {})",
            status.is_fresh, status.fetch_in_progress
        );
        return false;
    }

    match cache.force_refresh(now).await {
        Ok(read) if read.fallback_reason.is_some() => warn!(
            "Background refresh failed, still holding snapshot from {}",
            format_timestamp(read.snapshot.fetched_at())
        ),
        Ok(read) => debug!(
            "Background refresh stored {} assets",
            read.snapshot.assets().len()
        ),
        Err(CacheError::ConfigurationMissing) => {
            warn!("Background refresh skipped: credentials are not configured")
        }
        Err(err) => warn!("Background refresh failed: {err}"),
    }
    true
}
