//! Spawns the background sweeps that keep the fleet registry bounded.
//!
//! Three independent loops run for the lifetime of the process: an offline
//! sweep (marks silent proxies offline), a log purge, and a stats purge.
//! Each wraps the pure sweep functions in [`backend::domain::janitor`] in a
//! `tokio::time::interval`; failures are logged and the loop continues
//! rather than aborting the process.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use mockable::{Clock, DefaultClock};
use rand::Rng as _;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use backend::domain::janitor::{self, LOG_RETENTION, STATS_RETENTION};
use backend::outbound::persistence::{
    DbPool, DieselFleetRepository, DieselProxyLogRepository, DieselProxyStatsRepository,
};

const OFFLINE_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);
const LOG_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(5 * 60);
const STATS_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

fn interval(period: StdDuration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Sleep for a random fraction (0-10%) of `period` before the first tick, so
/// that several janitor instances restarting together do not all sweep in
/// lockstep.
async fn jitter_startup(period: StdDuration) {
    let period_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
    let max_jitter_ms = period_ms / 10;
    if max_jitter_ms == 0 {
        return;
    }
    let jitter_ms = rand::thread_rng().gen_range(0..max_jitter_ms);
    tokio::time::sleep(StdDuration::from_millis(jitter_ms)).await;
}

/// Spawn the offline/log/stats sweeps as detached background tasks.
///
/// `stale_window` overrides how long a proxy may go unseen before the
/// offline sweep marks it offline (see `STALE_PROXY_WINDOW_SECS`).
pub fn spawn(pool: &DbPool, stale_window: Duration) {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let fleet = DieselFleetRepository::new(pool.clone());
    let offline_clock = clock.clone();
    tokio::spawn(async move {
        jitter_startup(OFFLINE_SWEEP_INTERVAL).await;
        let mut ticker = interval(OFFLINE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match janitor::sweep_offline_proxies(&fleet, &offline_clock, stale_window).await {
                Ok(0) => {}
                Ok(marked) => info!(marked, "marked proxies offline"),
                Err(error) => error!(%error, "offline sweep failed"),
            }
        }
    });

    let proxy_logs = DieselProxyLogRepository::new(pool.clone());
    let log_clock = clock.clone();
    tokio::spawn(async move {
        jitter_startup(LOG_SWEEP_INTERVAL).await;
        let mut ticker = interval(LOG_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match janitor::sweep_expired_logs(&proxy_logs, &log_clock).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired proxy log lines"),
                Err(error) => error!(%error, "log purge sweep failed"),
            }
        }
    });

    let proxy_stats = DieselProxyStatsRepository::new(pool.clone());
    tokio::spawn(async move {
        jitter_startup(STATS_SWEEP_INTERVAL).await;
        let mut ticker = interval(STATS_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            match janitor::sweep_aged_stats(&proxy_stats, &clock).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged aged proxy stats samples"),
                Err(error) => error!(%error, "stats purge sweep failed"),
            }
        }
    });

    info!(
        stale_window_secs = stale_window.num_seconds(),
        log_retention_secs = LOG_RETENTION.num_seconds(),
        stats_retention_secs = STATS_RETENTION.num_seconds(),
        "background sweeps started"
    );
}
