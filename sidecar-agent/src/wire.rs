//! Wire DTOs for the `/api/v1/sync/*` and `/api/v1/health` endpoints,
//! mirroring `backend::inbound::http::sync` and `backend::inbound::http::health`.
//!
//! These are deliberately a second, independent definition rather than a
//! path dependency on `backend`: the agent only ever needs the JSON shape,
//! not the control plane's domain types, database pool, or web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /sync/register`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Hostname the proxy identifies as.
    pub hostname: String,
    /// Previously issued proxy id, if one is cached from an earlier run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_id: Option<String>,
}

/// Response to `POST /sync/register`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Server-assigned proxy identifier, kept for diagnostics only.
    pub proxy_id: String,
}

/// The compiled artefacts carried by a [`PollResponse`] when the sidecar's
/// configuration has changed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfigPayload {
    /// Rendered `parent.config` contents.
    pub parent_config: String,
    /// Rendered `sni.yaml` contents.
    pub sni_yaml: String,
    /// Rendered `ip_allow.yaml` contents.
    pub ip_allow_yaml: String,
}

/// Response to `GET /sync?hostname=&hash=`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    /// Whether the presented hash already matches the assigned configuration.
    pub unchanged: bool,
    /// Fingerprint of the assigned configuration, `None` if unassigned.
    pub hash: Option<String>,
    /// The compiled artefacts to apply, `None` when `unchanged` or unassigned.
    pub config: Option<PollConfigPayload>,
    /// Whether the sidecar should stream captured log lines right now.
    pub capture_logs: bool,
    /// If `capture_logs` is set, stream log lines until this instant.
    pub capture_until: Option<DateTime<Utc>>,
}

/// Outcome reported for an applied (or failed-to-apply) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    /// The configuration was applied and the proxy reloaded successfully.
    Ok,
    /// Applying the configuration failed; the prior fingerprint stands.
    Error,
}

/// Body of `POST /sync/ack`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    /// Hostname acknowledging the apply attempt.
    pub hostname: String,
    /// Fingerprint the acknowledgement refers to.
    pub hash: String,
    /// Whether the apply succeeded.
    pub status: AckStatus,
    /// Error detail, present only when `status` is [`AckStatus::Error`].
    pub message: Option<String>,
}

/// Body of `POST /sync/stats`: a single counter sample, all fields int64
/// except `active_connections`, which is a gauge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    /// Hostname the sample was captured from.
    pub hostname: String,
    /// When the sidecar captured the sample.
    pub captured_at: DateTime<Utc>,
    /// Current in-flight connections (gauge).
    pub active_connections: i64,
    /// Total connections accepted since proxy start.
    pub total_connections: i64,
    /// Total cache hits since proxy start.
    pub cache_hits: i64,
    /// Total cache misses since proxy start.
    pub cache_misses: i64,
    /// Total errors of any kind since proxy start.
    pub errors: i64,
    /// Total client requests served since proxy start.
    pub total_requests: i64,
    /// Total upstream connect attempts since proxy start.
    pub connect_requests: i64,
    /// Total 2xx responses since proxy start.
    pub responses_2xx: i64,
    /// Total 3xx responses since proxy start.
    pub responses_3xx: i64,
    /// Total 4xx responses since proxy start.
    pub responses_4xx: i64,
    /// Total 5xx responses since proxy start.
    pub responses_5xx: i64,
    /// Total upstream connect failures since proxy start.
    pub err_connect_fail: i64,
    /// Total client aborts since proxy start.
    pub err_client_abort: i64,
    /// Total broken server connections since proxy start.
    pub broken_server_conns: i64,
    /// Total bytes received from clients since proxy start.
    pub bytes_in: i64,
    /// Total bytes served to clients since proxy start.
    pub bytes_out: i64,
}

/// A single line within a [`LogsRequest`] batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogLineRequest {
    /// When the sidecar captured the line.
    pub captured_at: DateTime<Utc>,
    /// Raw log line text.
    pub text: String,
}

/// Body of `POST /sync/logs`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsRequest {
    /// Hostname the lines were captured from.
    pub hostname: String,
    /// Batch of captured log lines.
    pub lines: Vec<LogLineRequest>,
}

/// Response to `POST /sync/logs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    /// Whether the server still wants this capture to continue.
    pub continue_capture: bool,
}

/// Response to `GET /health`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Literal `"ok"` when the server is reachable.
    pub status: String,
    /// The server's clock at response time.
    pub server_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_response_deserializes_unchanged_shape() {
        let body = r#"{"unchanged":true,"hash":"abc","config":null,"captureLogs":false,"captureUntil":null}"#;
        let response: PollResponse = serde_json::from_str(body).unwrap();
        assert!(response.unchanged);
        assert_eq!(response.hash.as_deref(), Some("abc"));
        assert!(response.config.is_none());
    }

    #[test]
    fn poll_response_deserializes_config_payload() {
        let body = r#"{"unchanged":false,"hash":"def","config":{"parentConfig":"a","sniYaml":"b","ipAllowYaml":"c"},"captureLogs":true,"captureUntil":"2026-01-01T00:00:00Z"}"#;
        let response: PollResponse = serde_json::from_str(body).unwrap();
        assert!(!response.unchanged);
        assert!(response.capture_logs);
        let config = response.config.expect("config payload present");
        assert_eq!(config.parent_config, "a");
    }
}
