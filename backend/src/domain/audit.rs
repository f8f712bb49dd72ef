//! Audit log entries recorded for every mutating configuration and fleet
//! operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::IpAddr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::ids::{AuditId, UserId};

/// Stable action names recorded in [`AuditEntry::action`].
///
/// Kept as `&'static str` constants rather than an enum so new actions can
/// be added by adapters (e.g. the sidecar's own audit trail) without a
/// crate-wide enum change.
pub mod actions {
    /// A draft configuration was created.
    pub const CONFIG_CREATE: &str = "config.create";
    /// A draft configuration's rules were replaced.
    pub const CONFIG_UPDATE: &str = "config.update";
    /// A configuration was submitted for review.
    pub const CONFIG_SUBMIT: &str = "config.submit";
    /// A configuration was approved and compiled.
    pub const CONFIG_APPROVE: &str = "config.approve";
    /// A configuration was rejected back to draft.
    pub const CONFIG_REJECT: &str = "config.reject";
    /// A configuration was cloned into a new draft.
    pub const CONFIG_CLONE: &str = "config.clone";
    /// A configuration was deleted.
    pub const CONFIG_DELETE: &str = "config.delete";
    /// A proxy was assigned a configuration.
    pub const PROXY_ASSIGN: &str = "proxy.assign";
    /// A proxy was deleted from the fleet.
    pub const PROXY_DELETE: &str = "proxy.delete";
}

/// A single audit log entry.
///
/// ## Invariants
/// - `actor` is `None` only for entries raised by the janitor or the sync
///   protocol, which act without an authenticated operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Stable identifier.
    pub id: AuditId,
    /// Operator account that performed the action, if any.
    pub actor: Option<UserId>,
    /// Stable action name, see [`actions`].
    pub action: String,
    /// Kind of entity affected, e.g. `"configuration"` or `"proxy"`.
    pub entity_kind: String,
    /// Id of the affected entity.
    pub entity_id: Uuid,
    /// Entity state before the action, if captured.
    pub before: Option<Value>,
    /// Entity state after the action, if captured.
    pub after: Option<Value>,
    /// Source IP of the request that triggered the action, if known.
    pub source_ip: Option<IpAddr>,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_constants_use_dotted_namespace() {
        assert!(actions::CONFIG_APPROVE.contains('.'));
        assert!(actions::PROXY_ASSIGN.starts_with("proxy."));
    }
}
