//! Background sweeps that keep the fleet registry and its captured data
//! bounded: marking silent proxies offline, and purging expired logs and
//! aged metrics samples.
//!
//! Each sweep is a pure function over its ports plus a clock, so the
//! scheduling loop in `main` can be a thin `tokio::time::interval` wrapper
//! and the sweep logic itself is unit-testable with mocked ports and a
//! fixed clock, following the pattern in
//! [`crate::domain::authentication::AuthenticationService`].

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;

use crate::domain::ports::{
    FleetPersistenceError, ProxyCommand, ProxyLogPersistenceError, ProxyLogRepository,
    ProxyStatsPersistenceError, ProxyStatsRepository,
};

/// How long a proxy may go unseen before the offline sweep marks it
/// offline. Overridable via `STALE_PROXY_WINDOW_SECS`.
pub const DEFAULT_STALE_PROXY_WINDOW: Duration = Duration::seconds(120);

/// How long captured log lines are retained before the log sweep purges
/// them.
pub const LOG_RETENTION: Duration = Duration::hours(24);

/// How long metrics samples are retained before the stats sweep purges
/// them.
pub const STATS_RETENTION: Duration = Duration::days(7);

/// Mark every proxy whose `last_seen` predates `now - stale_window` as
/// offline. Returns the number of proxies updated.
pub async fn sweep_offline_proxies<PC>(
    proxies: &PC,
    clock: &Arc<dyn Clock>,
    stale_window: Duration,
) -> Result<u64, FleetPersistenceError>
where
    PC: ProxyCommand,
{
    let cutoff = clock.utc() - stale_window;
    proxies.mark_offline_before(cutoff).await
}

/// Delete captured log lines older than [`LOG_RETENTION`]. Returns the
/// number of rows removed.
pub async fn sweep_expired_logs<LG>(
    logs: &LG,
    clock: &Arc<dyn Clock>,
) -> Result<u64, ProxyLogPersistenceError>
where
    LG: ProxyLogRepository,
{
    let cutoff = clock.utc() - LOG_RETENTION;
    logs.purge_older_than(cutoff).await
}

/// Delete metrics samples older than [`STATS_RETENTION`]. Returns the
/// number of rows removed.
pub async fn sweep_aged_stats<ST>(
    stats: &ST,
    clock: &Arc<dyn Clock>,
) -> Result<u64, ProxyStatsPersistenceError>
where
    ST: ProxyStatsRepository,
{
    let cutoff = clock.utc() - STATS_RETENTION;
    stats.purge_older_than(cutoff).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockable::{Clock, DefaultClock};

    struct FixedClock(chrono::DateTime<Utc>);

    impl Clock for FixedClock {
        fn utc(&self) -> chrono::DateTime<Utc> {
            self.0
        }
    }

    fn fixed(clock_time: chrono::DateTime<Utc>) -> Arc<dyn Clock> {
        Arc::new(FixedClock(clock_time))
    }

    #[tokio::test]
    async fn sweep_offline_proxies_uses_clock_minus_window() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = fixed(now);
        let mut proxies = crate::domain::ports::MockProxyCommand::new();
        proxies
            .expect_mark_offline_before()
            .withf(move |cutoff| *cutoff == now - DEFAULT_STALE_PROXY_WINDOW)
            .returning(|_| Ok(3));

        let updated = sweep_offline_proxies(&proxies, &clock, DEFAULT_STALE_PROXY_WINDOW)
            .await
            .expect("sweep");
        assert_eq!(updated, 3);
    }

    #[tokio::test]
    async fn sweep_expired_logs_uses_log_retention() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = fixed(now);
        let mut logs = crate::domain::ports::MockProxyLogRepository::new();
        logs.expect_purge_older_than()
            .withf(move |cutoff| *cutoff == now - LOG_RETENTION)
            .returning(|_| Ok(42));

        let purged = sweep_expired_logs(&logs, &clock).await.expect("sweep");
        assert_eq!(purged, 42);
    }

    #[tokio::test]
    async fn sweep_aged_stats_uses_stats_retention() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = fixed(now);
        let mut stats = crate::domain::ports::MockProxyStatsRepository::new();
        stats
            .expect_purge_older_than()
            .withf(move |cutoff| *cutoff == now - STATS_RETENTION)
            .returning(|_| Ok(7));

        let purged = sweep_aged_stats(&stats, &clock).await.expect("sweep");
        assert_eq!(purged, 7);
    }

    #[test]
    fn default_clock_smoke() {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        assert!(clock.utc() <= Utc::now());
    }
}
