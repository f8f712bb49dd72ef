//! Rule types attached to a [`super::Configuration`].
//!
//! Each rule kind is evaluated in ascending `priority` order by the ATS
//! sidecar when it applies a configuration; ties are broken by rule id so
//! evaluation order is stable and reproducible.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};
use utoipa::ToSchema;

use crate::domain::ids::{ClientAclRuleId, DomainRuleId, IpRangeRuleId, ParentProxyId};

/// Where a request matching a rule should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Connect directly to the origin.
    Direct,
    /// Forward through the configuration's parent proxy chain.
    Parent,
}

/// Whether a client address is allowed to use the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AclAction {
    /// Permit the request.
    Allow,
    /// Refuse the request.
    Deny,
}

/// A routing rule keyed on destination domain.
///
/// `selector` may be an exact hostname (`example.com`) or a wildcard of the
/// form `*.example.com`, matching any direct subdomain chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainRule {
    /// Stable identifier, empty for rules not yet persisted.
    pub id: DomainRuleId,
    /// Hostname or wildcard pattern this rule matches.
    pub selector: String,
    /// Where matching traffic is routed.
    pub action: RouteAction,
    /// Evaluation order; lower values are evaluated first.
    pub priority: i32,
}

/// A routing rule keyed on an IPv4 CIDR block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IpRangeRule {
    /// Stable identifier, empty for rules not yet persisted.
    pub id: IpRangeRuleId,
    /// Network address of the CIDR block.
    pub network: Ipv4Addr,
    /// CIDR prefix length, 0-32.
    pub prefix_len: u8,
    /// Where matching traffic is routed.
    pub action: RouteAction,
    /// Evaluation order; lower values are evaluated first.
    pub priority: i32,
}

/// A client-ACL network selector.
///
/// IPv4 entries are CIDR blocks, matching [`IpRangeRule`]. IPv6 entries are
/// bare literal addresses matched exactly, with no CIDR notation, per the
/// validation rule that restricts IPv6 client-ACL selectors to single
/// addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClientAclNetwork {
    /// IPv4 CIDR block.
    V4 {
        /// Network address of the CIDR block.
        network: Ipv4Addr,
        /// CIDR prefix length, 0-32.
        prefix_len: u8,
    },
    /// Bare IPv6 literal, matched exactly.
    V6 {
        /// The literal address.
        address: Ipv6Addr,
    },
}

/// A client access-control rule keyed on the connecting client's address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientAclRule {
    /// Stable identifier, empty for rules not yet persisted.
    pub id: ClientAclRuleId,
    /// Client network selector.
    pub network: ClientAclNetwork,
    /// Whether to allow or deny matching clients.
    pub action: AclAction,
    /// Evaluation order; lower values are evaluated first.
    pub priority: i32,
}

/// A parent proxy a configuration may forward through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParentProxyEntry {
    /// Stable identifier, empty for entries not yet persisted.
    pub id: ParentProxyId,
    /// Parent proxy address.
    pub address: Ipv4Addr,
    /// Parent proxy port.
    pub port: u16,
    /// Failover order; lower values are tried first.
    pub priority: i32,
    /// Whether this entry currently participates in failover.
    pub enabled: bool,
}

/// The full set of rules attached to a configuration, grouped by kind.
///
/// This is the shape both the compiler and the lifecycle service operate
/// over; repositories assemble it from separate tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Per-domain routing rules.
    pub domain_rules: Vec<DomainRule>,
    /// Per-IP-range routing rules.
    pub ip_range_rules: Vec<IpRangeRule>,
    /// Client access-control rules.
    pub client_acl_rules: Vec<ClientAclRule>,
    /// Parent proxy chain, in failover order.
    pub parent_proxies: Vec<ParentProxyEntry>,
}

impl RuleSet {
    /// Sort every rule vector by `(priority, id)` so iteration order is
    /// deterministic regardless of how the repository fetched them.
    pub fn sort_deterministically(&mut self) {
        self.domain_rules
            .sort_by_key(|r| (r.priority, r.id.as_uuid()));
        self.ip_range_rules
            .sort_by_key(|r| (r.priority, r.id.as_uuid()));
        self.client_acl_rules
            .sort_by_key(|r| (r.priority, r.id.as_uuid()));
        self.parent_proxies
            .sort_by_key(|p| (p.priority, p.id.as_uuid()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_deterministically_orders_by_priority_then_id() {
        let mut set = RuleSet {
            domain_rules: vec![
                DomainRule {
                    id: DomainRuleId::new(),
                    selector: "b.example.com".into(),
                    action: RouteAction::Direct,
                    priority: 5,
                },
                DomainRule {
                    id: DomainRuleId::new(),
                    selector: "a.example.com".into(),
                    action: RouteAction::Direct,
                    priority: 1,
                },
            ],
            ..Default::default()
        };
        set.sort_deterministically();
        assert_eq!(set.domain_rules[0].priority, 1);
        assert_eq!(set.domain_rules[1].priority, 5);
    }
}
