//! Port for proxy metrics sample persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::fleet::ProxySample;
use crate::domain::ids::ProxyId;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by proxy stats repository adapters.
    pub enum ProxyStatsPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "proxy stats repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "proxy stats repository query failed: {message}",
    }
}

/// Port for storing and querying proxy counter samples.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyStatsRepository: Send + Sync {
    /// Record one metrics sample pushed by a sidecar.
    async fn insert_sample(&self, sample: ProxySample) -> Result<(), ProxyStatsPersistenceError>;

    /// Fetch samples for a proxy at or after `since`, oldest first.
    async fn samples_since(
        &self,
        proxy_id: ProxyId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProxySample>, ProxyStatsPersistenceError>;

    /// Delete samples older than `cutoff`. Returns the number of rows removed.
    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProxyStatsPersistenceError>;
}
