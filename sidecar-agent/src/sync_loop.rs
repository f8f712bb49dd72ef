//! The agent's main sync loop: poll, apply-or-scrape, acknowledge.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;

use crate::apply;
use crate::client::{self, BackendClient};
use crate::logs::LogCapture;
use crate::proxy_ctl;
use crate::wire::{AckRequest, AckStatus, StatsRequest};

/// Fixed inputs for one agent's sync loop.
pub struct SyncLoopConfig {
    /// Backend HTTP client.
    pub client: BackendClient,
    /// Hostname this proxy registered under.
    pub hostname: String,
    /// Directory the proxy reads its config files from.
    pub config_dir: PathBuf,
    /// Path to the proxy's diagnostic log, for debug log capture.
    pub diagnostic_log_path: PathBuf,
    /// Interval between poll cycles.
    pub sync_interval: Duration,
    /// Sender this loop uses to report a 404-triggered disconnect.
    pub connected: watch::Sender<bool>,
    /// Receiver this loop reads to decide whether to run a cycle.
    pub connected_rx: watch::Receiver<bool>,
}

/// Run one sync-interval-cadence loop forever. Pauses (skips the tick's
/// work) while `connected` reads `false`.
pub async fn run(config: SyncLoopConfig) -> ! {
    let log_capture = Arc::new(LogCapture::new());
    let mut ticker = interval(config.sync_interval);
    loop {
        ticker.tick().await;
        if !*config.connected_rx.borrow() {
            continue;
        }
        if let Err(error) = run_once(
            &config.client,
            &config.hostname,
            &config.config_dir,
            &config.diagnostic_log_path,
            &log_capture,
            &config.connected,
        )
        .await
        {
            tracing::warn!(%error, hostname = %config.hostname, "sync cycle failed");
        }
    }
}

async fn run_once(
    client: &BackendClient,
    hostname: &str,
    config_dir: &std::path::Path,
    diagnostic_log_path: &std::path::Path,
    log_capture: &Arc<LogCapture>,
    connected: &watch::Sender<bool>,
) -> Result<(), crate::error::AgentError> {
    let local_fingerprint = apply::read_sentinel(config_dir).await?;

    let response = match client.poll(hostname, local_fingerprint.as_deref()).await {
        Ok(response) => response,
        Err(error) if client::is_not_found(&error) => {
            tracing::warn!(hostname, "poll returned not_found, flagging disconnected");
            let _ = connected.send(false);
            return Ok(());
        }
        Err(error) => return Err(error),
    };

    if response.capture_logs {
        if let Some(until) = response.capture_until {
            log_capture
                .request_until(
                    until,
                    client.clone(),
                    hostname.to_owned(),
                    diagnostic_log_path.to_path_buf(),
                )
                .await;
        }
    }

    if response.unchanged {
        push_counters(client, hostname).await;
        return Ok(());
    }

    let hash = response.hash.clone().unwrap_or_default();
    match apply::apply(config_dir, &response).await {
        Ok(()) => {
            client
                .ack(&AckRequest {
                    hostname: hostname.to_owned(),
                    hash,
                    status: AckStatus::Ok,
                    message: None,
                })
                .await?;
            push_counters(client, hostname).await;
        }
        Err(message) => {
            client
                .ack(&AckRequest {
                    hostname: hostname.to_owned(),
                    hash,
                    status: AckStatus::Error,
                    message: Some(message),
                })
                .await?;
        }
    }
    Ok(())
}

async fn push_counters(client: &BackendClient, hostname: &str) {
    let sample = match proxy_ctl::scrape_counters().await {
        Ok(sample) => sample,
        Err(error) => {
            tracing::warn!(%error, hostname, "failed to scrape proxy counters");
            return;
        }
    };
    let request = StatsRequest {
        hostname: hostname.to_owned(),
        captured_at: chrono::Utc::now(),
        active_connections: sample.active_connections,
        total_connections: sample.total_connections,
        cache_hits: sample.cache_hits,
        cache_misses: sample.cache_misses,
        errors: sample.errors,
        total_requests: sample.total_requests,
        connect_requests: sample.connect_requests,
        responses_2xx: sample.responses_2xx,
        responses_3xx: sample.responses_3xx,
        responses_4xx: sample.responses_4xx,
        responses_5xx: sample.responses_5xx,
        err_connect_fail: sample.err_connect_fail,
        err_client_abort: sample.err_client_abort,
        broken_server_conns: sample.broken_server_conns,
        bytes_in: sample.bytes_in,
        bytes_out: sample.bytes_out,
    };
    if let Err(error) = client.push_stats(&request).await {
        tracing::warn!(%error, hostname, "failed to push counter sample");
    }
}
