//! Wire types for the sidecar sync protocol.
//!
//! These are plain DTOs shared between [`crate::inbound::http::sync`] and
//! the `sidecar-agent` binary's HTTP client; they carry no behaviour beyond
//! (de)serialisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::ProxyId;

/// Body of `POST /sync/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Hostname the sidecar's ATS instance identifies as.
    pub hostname: String,
    /// Previously issued proxy id, if the sidecar has one cached.
    #[serde(default)]
    pub proxy_id: Option<ProxyId>,
}

/// Response to `POST /sync/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    /// Assigned proxy identifier, to be cached by the sidecar for future calls.
    pub proxy_id: ProxyId,
}

/// The compiled artefacts carried by a [`PollResponse`] when the sidecar's
/// configuration has changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
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
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    /// Whether the sidecar's presented hash already matches the assigned
    /// configuration (or no configuration is assigned at all).
    pub unchanged: bool,
    /// Fingerprint of the assigned configuration, `None` if unassigned.
    pub hash: Option<String>,
    /// The compiled artefacts to apply; `None` when `unchanged` is true or
    /// no configuration is assigned.
    pub config: Option<PollConfigPayload>,
    /// Whether the sidecar should stream captured log lines right now.
    pub capture_logs: bool,
    /// If `capture_logs` is set, stream log lines until this instant.
    pub capture_until: Option<DateTime<Utc>>,
}

/// Body of `POST /sync/{proxy_id}/ack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    /// Fingerprint of the artefacts the sidecar applied.
    pub fingerprint: String,
}

/// Body of `POST /sync/stats`: a single counter sample, all fields int64
/// per the metrics record, except `active_connections` which is a gauge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    /// When the sidecar captured the sample.
    pub captured_at: DateTime<Utc>,
    /// Current in-flight connections (gauge).
    pub active_connections: i64,
    /// Total connections accepted.
    pub total_connections: i64,
    /// Total cache hits.
    pub cache_hits: i64,
    /// Total cache misses.
    pub cache_misses: i64,
    /// Total errors of any kind.
    pub errors: i64,
    /// Total client requests served.
    pub total_requests: i64,
    /// Total upstream connect attempts.
    pub connect_requests: i64,
    /// Total 2xx responses.
    pub responses_2xx: i64,
    /// Total 3xx responses.
    pub responses_3xx: i64,
    /// Total 4xx responses.
    pub responses_4xx: i64,
    /// Total 5xx responses.
    pub responses_5xx: i64,
    /// Total upstream connect failures.
    pub err_connect_fail: i64,
    /// Total client aborts.
    pub err_client_abort: i64,
    /// Total broken server connections.
    pub broken_server_conns: i64,
    /// Total bytes received from clients.
    pub bytes_in: i64,
    /// Total bytes served to clients.
    pub bytes_out: i64,
}

/// A single line within a [`LogsRequest`] batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogLineDto {
    /// When the sidecar captured the line.
    pub captured_at: DateTime<Utc>,
    /// Raw log line text.
    pub text: String,
}

/// Body of `POST /sync/{proxy_id}/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogsRequest {
    /// Batch of captured log lines.
    pub lines: Vec<LogLineDto>,
}

