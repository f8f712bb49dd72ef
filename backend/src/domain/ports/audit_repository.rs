//! Port for audit log persistence.
//!
//! Audit writes are best-effort from the caller's perspective: a failure to
//! append an entry must never fail the operation being audited. Services
//! call [`AuditLogRepository::append`] and log a warning on error rather
//! than propagating it; see [`crate::domain::audit`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::audit::AuditEntry;
use crate::domain::ids::UserId;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by audit repository adapters.
    pub enum AuditPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "audit repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "audit repository query failed: {message}",
    }
}

/// Filter for [`AuditLogRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct AuditListFilter {
    /// Restrict to entries whose `entity_kind` matches this value.
    pub entity_type: Option<String>,
    /// Restrict to entries touching this entity id (as its raw UUID string).
    pub entity_id: Option<String>,
    /// Restrict to entries performed by this operator.
    pub user_id: Option<UserId>,
    /// Restrict to entries created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Restrict to entries created at or before this instant.
    pub to: Option<DateTime<Utc>>,
    /// Opaque pagination cursor from a previous call.
    pub cursor: Option<String>,
    /// Maximum number of items to return.
    pub limit: u32,
}

/// Port for append-only audit log storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an audit entry.
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditPersistenceError>;

    /// List audit entries, newest first.
    async fn list(
        &self,
        filter: AuditListFilter,
    ) -> Result<Vec<AuditEntry>, AuditPersistenceError>;
}
