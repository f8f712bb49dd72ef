//! Fleet member (proxy) entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use utoipa::ToSchema;

use crate::domain::ids::{ConfigId, ProxyId};

/// A single ATS instance registered with the control plane.
///
/// ## Invariants
/// - `hostname` is unique across the fleet.
/// - `log_capture_deadline`, once set, only ever moves forward in time (see
///   [`crate::domain::fleet::registry::FleetRegistryService::request_log_capture`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Proxy {
    /// Stable identifier.
    pub id: ProxyId,
    /// Unique hostname reported at registration.
    pub hostname: String,
    /// Configuration currently assigned to this proxy, if any.
    pub assigned_config: Option<ConfigId>,
    /// Whether the proxy has polled within the staleness window.
    pub is_online: bool,
    /// Last time the proxy polled or registered.
    pub last_seen: DateTime<Utc>,
    /// IP address the proxy registered from.
    pub registered_ip: IpAddr,
    /// Fingerprint of the artefacts the sidecar last reported applying.
    pub observed_fingerprint: Option<String>,
    /// If set, the sidecar should stream logs until this instant.
    pub log_capture_deadline: Option<DateTime<Utc>>,
}

impl Proxy {
    /// Whether the proxy's currently applied fingerprint matches the
    /// fingerprint of its assigned configuration, i.e. it is in sync.
    #[must_use]
    pub fn is_in_sync_with(&self, expected_fingerprint: &str) -> bool {
        self.observed_fingerprint.as_deref() == Some(expected_fingerprint)
    }
}

/// A single counter sample scraped by a sidecar from `traffic_ctl metric get`.
///
/// All fields are int64 and monotonically non-decreasing within a proxy
/// process lifetime, except `active_connections`, which is a gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxySample {
    /// Proxy the sample came from.
    pub proxy_id: ProxyId,
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

/// A single captured log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    /// Proxy the line came from.
    pub proxy_id: ProxyId,
    /// When the sidecar captured the line.
    pub captured_at: DateTime<Utc>,
    /// Raw log line text.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_proxy() -> Proxy {
        Proxy {
            id: ProxyId::new(),
            hostname: "edge-1".into(),
            assigned_config: None,
            is_online: true,
            last_seen: Utc::now(),
            registered_ip: "10.0.0.1".parse().unwrap(),
            observed_fingerprint: Some("abc".into()),
            log_capture_deadline: None,
        }
    }

    #[test]
    fn in_sync_compares_fingerprint() {
        let proxy = sample_proxy();
        assert!(proxy.is_in_sync_with("abc"));
        assert!(!proxy.is_in_sync_with("def"));
    }
}
