//! Port for proxy log line persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::fleet::LogLine;
use crate::domain::ids::ProxyId;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by proxy log repository adapters.
    pub enum ProxyLogPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "proxy log repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "proxy log repository query failed: {message}",
    }
}

/// Port for storing and retrieving captured proxy log lines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyLogRepository: Send + Sync {
    /// Append a batch of log lines pushed by a sidecar during a capture window.
    async fn append(
        &self,
        proxy_id: ProxyId,
        lines: Vec<LogLine>,
    ) -> Result<(), ProxyLogPersistenceError>;

    /// List captured log lines for a proxy, newest first, capped at `limit`.
    async fn list(
        &self,
        proxy_id: ProxyId,
        limit: u32,
    ) -> Result<Vec<LogLine>, ProxyLogPersistenceError>;

    /// Delete log lines older than `cutoff`. Returns the number of rows removed.
    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProxyLogPersistenceError>;
}
