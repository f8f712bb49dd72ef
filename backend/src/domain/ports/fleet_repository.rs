//! Port for fleet member (proxy) persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::domain::fleet::Proxy;
use crate::domain::ids::{ConfigId, ProxyId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by fleet repository adapters.
    pub enum FleetPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "fleet repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "fleet repository query failed: {message}",
        /// No proxy exists with the given id.
        NotFound { id: String } => "proxy {id} not found",
    }
}

/// Outcome of a [`ProxyCommand::register`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A brand new proxy record was created.
    Created,
    /// An existing, previously seen proxy re-registered (e.g. after restart).
    Reused,
}

/// Driving port for fleet mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyCommand: Send + Sync {
    /// Register a proxy, creating it if `hostname` has not been seen before
    /// or reusing the existing record otherwise.
    async fn register(
        &self,
        hostname: String,
        registered_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<(Proxy, RegisterOutcome), FleetPersistenceError>;

    /// Record a successful poll: refresh `last_seen` and, if the sidecar
    /// reports having applied a different fingerprint, update
    /// `observed_fingerprint`.
    async fn record_poll(
        &self,
        id: ProxyId,
        observed_fingerprint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError>;

    /// Record that a sidecar acknowledged applying `fingerprint`.
    async fn record_ack(
        &self,
        id: ProxyId,
        fingerprint: String,
        now: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError>;

    /// Extend (never shorten) a proxy's log-capture deadline.
    async fn extend_capture_deadline(
        &self,
        id: ProxyId,
        capture_until: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError>;

    /// Assign a proxy to a configuration, or clear its assignment with `None`.
    async fn assign_config(
        &self,
        id: ProxyId,
        config_id: Option<ConfigId>,
    ) -> Result<Proxy, FleetPersistenceError>;

    /// Mark every proxy whose `last_seen` is older than `cutoff` as offline.
    /// Returns the number of proxies updated.
    async fn mark_offline_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, FleetPersistenceError>;

    /// Remove a proxy record entirely.
    async fn delete(&self, id: ProxyId) -> Result<(), FleetPersistenceError>;
}

/// Driving port for fleet reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyQuery: Send + Sync {
    /// Fetch a proxy by id.
    async fn find_by_id(&self, id: ProxyId) -> Result<Option<Proxy>, FleetPersistenceError>;

    /// Fetch a proxy by hostname.
    async fn find_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Proxy>, FleetPersistenceError>;

    /// List every proxy in the fleet.
    async fn list(&self) -> Result<Vec<Proxy>, FleetPersistenceError>;
}
