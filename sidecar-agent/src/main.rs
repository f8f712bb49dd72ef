#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]
//! Sidecar agent: one process per Traffic Server instance. Registers with
//! the control plane, polls for configuration changes, applies and
//! reloads the proxy, reports counters, and streams debug logs on demand.

mod apply;
mod cli;
mod client;
mod error;
mod liveness;
mod logs;
mod proxy_ctl;
mod registration;
mod sync_loop;
mod wire;

use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::sync::watch;

use client::BackendClient;

/// Convention for where Traffic Server writes its diagnostic log, relative
/// to the sidecar's config directory's parent.
fn diagnostic_log_path(config_dir: &std::path::Path) -> std::path::PathBuf {
    config_dir
        .parent()
        .unwrap_or(config_dir)
        .join("log/trafficserver/diags.log")
}

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    init_tracing(&args.log_level);

    let hostname = args.resolved_hostname();
    let client = BackendClient::new(args.backend_url.clone(), args.sync_shared_secret.clone());
    let diagnostic_log = diagnostic_log_path(&args.config_dir);

    tracing::info!(
        hostname,
        backend_url = %args.backend_url,
        config_id = %args.config_id,
        "starting sidecar agent",
    );

    let assigned_proxy_id = registration::register_until_success(&client, &hostname, None).await;
    let proxy_id = Arc::new(Mutex::new(assigned_proxy_id));

    let (connected_tx, connected_rx) = watch::channel(true);

    tokio::spawn(liveness::run(
        client.clone(),
        hostname.clone(),
        proxy_id,
        connected_tx.clone(),
    ));

    sync_loop::run(sync_loop::SyncLoopConfig {
        client,
        hostname,
        config_dir: args.config_dir,
        diagnostic_log_path: diagnostic_log,
        sync_interval: args.sync_interval,
        connected: connected_tx,
        connected_rx,
    })
    .await;
}

fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().json().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_log_path_is_a_sibling_of_the_config_dir() {
        let path = diagnostic_log_path(std::path::Path::new("/opt/etc/trafficserver"));
        assert_eq!(path, std::path::PathBuf::from("/opt/log/trafficserver/diags.log"));
    }
}
