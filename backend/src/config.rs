//! Process configuration loaded from the environment via `ortho_config`.
//!
//! Mirrors the teacher's `er_snapshots` binary's use of
//! `#[derive(OrthoConfig)]` over a flat, env-only settings struct (no CLI
//! surface is needed here, unlike `er_snapshots`). Uses an empty prefix so
//! field names map directly onto the exact, unprefixed variable names this
//! crate's ambient configuration contract names (`DATABASE_URL`, `PORT`,
//! …).

use std::net::IpAddr;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Seconds a proxy may go unseen before the offline sweep marks it
/// offline; see `backend::domain::janitor::DEFAULT_STALE_PROXY_WINDOW`.
fn default_stale_proxy_window_secs() -> i64 {
    120
}

/// Control-plane process settings, loaded once at startup.
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "")]
pub struct BackendSettings {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Redis connection string, accepted but currently unused: caching
    /// sits outside this crate's scope.
    pub redis_url: Option<String>,
    /// Pepper mixed into bearer-token hashing; see
    /// `backend::domain::auth::hash_token`.
    pub session_token_pepper: String,
    /// Address the HTTP server binds to.
    #[ortho_config(default = default_host())]
    pub host: IpAddr,
    /// Port the HTTP server binds to.
    #[ortho_config(default = default_port())]
    pub port: u16,
    /// Shared secret sidecars must present for sync endpoints; see
    /// `backend::SyncSecret`.
    pub sync_shared_secret: Option<String>,
    /// Offline-sweep staleness window, in seconds.
    #[ortho_config(default = default_stale_proxy_window_secs())]
    pub stale_proxy_window_secs: i64,
}

impl BackendSettings {
    /// Offline-sweep staleness window as a [`chrono::Duration`].
    #[must_use]
    pub fn stale_proxy_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_proxy_window_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env_lock::lock_env;

    #[test]
    fn defaults_apply_when_only_required_fields_are_set() {
        let _guard = lock_env([
            ("DATABASE_URL", Some("postgres://example".to_owned())),
            ("REDIS_URL", None::<String>),
            ("SESSION_TOKEN_PEPPER", Some("pepper".to_owned())),
            ("HOST", None::<String>),
            ("PORT", None::<String>),
            ("SYNC_SHARED_SECRET", None::<String>),
            ("STALE_PROXY_WINDOW_SECS", None::<String>),
        ]);

        let settings =
            BackendSettings::load_from_iter(std::iter::empty::<std::ffi::OsString>())
                .expect("settings should load from defaults");

        assert_eq!(settings.database_url, "postgres://example");
        assert_eq!(settings.host, default_host());
        assert_eq!(settings.port, default_port());
        assert_eq!(settings.stale_proxy_window_secs, 120);
        assert_eq!(settings.stale_proxy_window(), chrono::Duration::seconds(120));
    }

    #[test]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("DATABASE_URL", Some("postgres://example".to_owned())),
            ("SESSION_TOKEN_PEPPER", Some("pepper".to_owned())),
            ("PORT", Some("9090".to_owned())),
            ("STALE_PROXY_WINDOW_SECS", Some("300".to_owned())),
            ("SYNC_SHARED_SECRET", Some("s3cr3t".to_owned())),
        ]);

        let settings =
            BackendSettings::load_from_iter(std::iter::empty::<std::ffi::OsString>())
                .expect("settings should load with overrides");

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.stale_proxy_window_secs, 300);
        assert_eq!(settings.sync_shared_secret.as_deref(), Some("s3cr3t"));
    }
}
