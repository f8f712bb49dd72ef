//! Forward-proxy configurations: the versioned, reviewable unit the fleet
//! synchronises.
//!
//! A [`Configuration`] owns a [`rules::RuleSet`] and moves through the
//! lifecycle states in [`ConfigStatus`]; [`crate::domain::lifecycle`] holds
//! the transition guards, and [`crate::domain::compiler`] turns an
//! approved configuration plus its rules into the artefacts ATS consumes.

pub mod rules;
pub mod validation;

pub use rules::{
    AclAction, ClientAclNetwork, ClientAclRule, DomainRule, IpRangeRule, ParentProxyEntry,
    RouteAction, RuleSet,
};
pub use validation::RuleValidationError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ids::{ConfigId, UserId};

/// Default action applied when no rule matches a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DefaultAction {
    /// Connect directly to the origin.
    Direct,
    /// Forward through the configuration's parent proxy chain.
    Parent,
}

/// Lifecycle status of a configuration.
///
/// Collapses the four raw states an approval workflow needs
/// (`draft`, `pending_approval`, `approved`, `active`) into three resting
/// states plus [`Self::Displaced`], which records *when* a configuration
/// stopped being the active one for its proxies, so audit queries do not
/// need a separate history table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConfigStatus {
    /// Being authored; may be freely edited.
    Draft,
    /// Submitted for review; rules are frozen until approved or rejected.
    PendingApproval,
    /// Approved and compiled; serves live traffic on its assigned proxies.
    Active,
    /// Was active, then superseded by a newer approval for the same proxies.
    Displaced {
        /// When this configuration stopped being active.
        previously_active_at: DateTime<Utc>,
    },
}

impl ConfigStatus {
    /// Whether the configuration's rules may currently be edited.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether the configuration currently serves live traffic.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A versioned forward-proxy configuration.
///
/// ## Invariants
/// - `version` starts at 1 and increments on every edit while in
///   [`ConfigStatus::Draft`].
/// - `fingerprint` is `None` until the configuration is first approved, and
///   is recomputed (but does not change `version`) whenever a proxy lazily
///   recompiles against the same approved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Stable identifier.
    pub id: ConfigId,
    /// Operator-facing name, unique is not enforced but recommended.
    pub name: String,
    /// Free-form description shown in the UI.
    pub description: String,
    /// Monotonically increasing edit counter.
    pub version: i32,
    /// Action applied when no rule matches.
    pub default_action: DefaultAction,
    /// Current lifecycle state.
    pub status: ConfigStatus,
    /// SHA-256 hex digest of the last compiled artefact set, if compiled.
    pub fingerprint: Option<String>,
    /// Account that created the configuration.
    pub created_by: UserId,
    /// When the configuration was created.
    pub created_at: DateTime<Utc>,
    /// Account that last edited the configuration's rules.
    pub modified_by: UserId,
    /// When the configuration was last edited.
    pub modified_at: DateTime<Utc>,
    /// Account that submitted the configuration for review, if submitted.
    pub submitted_by: Option<UserId>,
    /// When the configuration was submitted for review, if submitted.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Account that approved the configuration, if approved.
    pub approved_by: Option<UserId>,
    /// When the configuration was approved, if approved.
    pub approved_at: Option<DateTime<Utc>>,
}

/// A configuration together with the rules the compiler needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationWithRules {
    /// The configuration itself.
    pub configuration: Configuration,
    /// Its attached rule set.
    pub rules: RuleSet,
}

/// Fields accepted when creating a new draft configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewConfiguration {
    /// Operator-facing name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Action applied when no rule matches.
    pub default_action: DefaultAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_is_editable_other_states_are_not() {
        assert!(ConfigStatus::Draft.is_editable());
        assert!(!ConfigStatus::PendingApproval.is_editable());
        assert!(!ConfigStatus::Active.is_editable());
        assert!(!ConfigStatus::Displaced {
            previously_active_at: Utc::now()
        }
        .is_editable());
    }

    #[test]
    fn only_active_reports_is_active() {
        assert!(ConfigStatus::Active.is_active());
        assert!(!ConfigStatus::Draft.is_active());
    }
}
