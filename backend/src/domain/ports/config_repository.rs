//! Port for configuration persistence: drafting, review and compilation.
//!
//! Split into [`ConfigCommand`] (mutations, including the guarded lifecycle
//! transitions) and [`ConfigQuery`] (reads) per the driving-port convention
//! used throughout this crate. Lifecycle *guards* -- whether a transition is
//! legal given the current status -- live in
//! [`crate::domain::lifecycle`], not here: the repository trusts its caller
//! and focuses on making the storage-level compare-and-swap atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::config::{Configuration, ConfigurationWithRules, NewConfiguration, RuleSet};
use crate::domain::ids::{ConfigId, ProxyId, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by configuration repository adapters.
    pub enum ConfigPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "config repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "config repository query failed: {message}",
        /// The configuration was not in the status the caller expected.
        StatusMismatch { expected: String, actual: String } =>
            "expected configuration status {expected}, found {actual}",
        /// No configuration exists with the given id.
        NotFound { id: String } => "configuration {id} not found",
    }
}

/// Optional filters for [`ConfigQuery::list`].
#[derive(Debug, Clone, Default)]
pub struct ConfigListFilter {
    /// Restrict to configurations in this status, if set.
    pub status: Option<String>,
    /// Opaque pagination cursor from a previous call.
    pub cursor: Option<String>,
    /// Maximum number of items to return.
    pub limit: u32,
}

/// Result of an [`ConfigCommand::approve`] call: the newly active
/// configuration id plus any configurations displaced from the same proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveOutcome {
    /// Ids of configurations that were [`Active`](crate::domain::config::ConfigStatus::Active)
    /// on at least one of the newly assigned proxies and are now displaced.
    pub displaced: Vec<ConfigId>,
}

/// Driving port for configuration mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigCommand: Send + Sync {
    /// Create a new draft configuration with an empty rule set.
    async fn create_draft(
        &self,
        new_config: NewConfiguration,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError>;

    /// Replace the entire rule set of a draft configuration and bump its
    /// version. Callers must have already checked the configuration is a
    /// draft.
    async fn replace_rules(
        &self,
        id: ConfigId,
        rules: RuleSet,
        modified_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError>;

    /// Move a draft to pending approval.
    async fn submit(
        &self,
        id: ConfigId,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError>;

    /// Move a pending-approval configuration back to draft.
    async fn reject(
        &self,
        id: ConfigId,
        rejected_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError>;

    /// Approve a pending-approval configuration, compile it, assign it to
    /// `proxy_ids`, and atomically displace whatever was previously active
    /// on any of those proxies. Implementations perform this as a single
    /// transaction so no proxy ever observes two active configurations.
    async fn approve(
        &self,
        id: ConfigId,
        approved_by: UserId,
        fingerprint: String,
        proxy_ids: Vec<ProxyId>,
        now: DateTime<Utc>,
    ) -> Result<(Configuration, ApproveOutcome), ConfigPersistenceError>;

    /// Create a new draft configuration by copying another's rules.
    async fn clone_config(
        &self,
        source_id: ConfigId,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError>;

    /// Delete a draft configuration. Non-draft configurations must be
    /// rejected or superseded first.
    async fn delete(&self, id: ConfigId) -> Result<(), ConfigPersistenceError>;
}

/// Driving port for configuration reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigQuery: Send + Sync {
    /// Fetch a configuration with its rules.
    async fn get(
        &self,
        id: ConfigId,
    ) -> Result<Option<ConfigurationWithRules>, ConfigPersistenceError>;

    /// List configurations, optionally filtered and paginated.
    async fn list(
        &self,
        filter: ConfigListFilter,
    ) -> Result<Vec<Configuration>, ConfigPersistenceError>;

    /// Fetch the active configuration and rules assigned to a proxy, used by
    /// the sync protocol and by the janitor's lazy recompile path.
    async fn active_for_proxy(
        &self,
        proxy_id: ProxyId,
    ) -> Result<Option<ConfigurationWithRules>, ConfigPersistenceError>;
}
