//! Command-line arguments for the sidecar agent.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|error| error.to_string())
}

/// Agent launch parameters. One process per proxy instance.
#[derive(Debug, Clone, Parser)]
#[command(name = "sidecar-agent", version, about = "ATS fleet sidecar agent")]
pub struct Args {
    /// Base URL of the control plane, e.g. `https://fleet.internal`.
    #[arg(long)]
    pub backend_url: String,

    /// Informational configuration identifier; actual assignment happens
    /// server-side and is not enforced from this flag.
    #[arg(long)]
    pub config_id: String,

    /// Hostname this proxy registers under. Defaults to the OS hostname.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Interval between sync polls.
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub sync_interval: Duration,

    /// Directory the proxy reads `parent.config`, `sni.yaml` and
    /// `ip_allow.yaml` from.
    #[arg(long, default_value = "/opt/etc/trafficserver")]
    pub config_dir: PathBuf,

    /// Tracing log level filter, e.g. `info`, `debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Optional shared secret sent as `X-Fleet-Sync-Secret` on every request.
    #[arg(long, env = "SYNC_SHARED_SECRET")]
    pub sync_shared_secret: Option<String>,
}

impl Args {
    /// Resolve the effective hostname, falling back to the OS hostname.
    #[must_use]
    pub fn resolved_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(os_hostname)
    }
}

fn os_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown-host".to_owned())
}
