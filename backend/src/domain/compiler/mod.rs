//! Pure compilation of an approved configuration into the three artefacts
//! an ATS instance applies: `parent.config`, `sni.yaml` and `ip_allow.yaml`.
//!
//! This module performs no I/O and holds no state: given the same
//! [`Configuration`](crate::domain::config::Configuration) and
//! [`RuleSet`](crate::domain::config::RuleSet), [`compile`] always produces
//! byte-identical output (invariant I-1), which is why CIDR expansion
//! ([`cidr`]) avoids any library whose rendering could drift between
//! versions.

pub mod cidr;
pub mod fingerprint;

use std::fmt::Write as _;

use crate::domain::config::{
    AclAction, ClientAclNetwork, Configuration, DefaultAction, RouteAction, RuleSet,
};

/// The three artefacts produced by compiling a configuration, plus their
/// combined fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifacts {
    /// Rendered `parent.config` contents.
    pub parent_config: String,
    /// Rendered `sni.yaml` contents.
    pub sni_yaml: String,
    /// Rendered `ip_allow.yaml` contents.
    pub ip_allow_yaml: String,
    /// SHA-256 hex digest over all three artefacts.
    pub fingerprint: String,
}

/// Compile a configuration and its rule set into ATS artefacts.
///
/// Rules are rendered in priority order (see
/// [`RuleSet::sort_deterministically`]); callers should sort before
/// compiling if the rule set came from an unordered source such as a
/// database query without an `ORDER BY`.
#[must_use]
pub fn compile(config: &Configuration, rules: &RuleSet) -> CompiledArtifacts {
    let parent_config = render_parent_config(config, rules);
    let sni_yaml = render_sni_yaml(rules);
    let ip_allow_yaml = render_ip_allow_yaml(rules);
    let digest = fingerprint::fingerprint(&parent_config, &sni_yaml, &ip_allow_yaml);
    CompiledArtifacts {
        parent_config,
        sni_yaml,
        ip_allow_yaml,
        fingerprint: digest,
    }
}

/// Fixed infrastructure preamble every `parent.config` opens with, ahead of
/// any user-authored rule: loopback and link-local traffic always goes
/// direct, and in-cluster DNS suffixes never traverse a parent proxy.
const PARENT_CONFIG_PREAMBLE: &str = "\
# Localhost
dest_ip=127.0.0.0-127.255.255.255 go_direct=true
# Link-local
dest_ip=169.254.0.0-169.254.255.255 go_direct=true
# Kubernetes
dest_domain=.svc.cluster.local go_direct=true
dest_domain=.cluster.local go_direct=true
dest_domain=localhost go_direct=true
";

/// `parent.config` writes a leading `*.` selector as a leading `.`;
/// `sni.yaml` keeps the `*.` form. Bare domains pass through unchanged.
fn parent_config_selector(selector: &str) -> String {
    match selector.strip_prefix("*.") {
        Some(rest) => format!(".{rest}"),
        None => selector.to_owned(),
    }
}

fn render_parent_config(config: &Configuration, rules: &RuleSet) -> String {
    let mut out = String::new();
    out.push_str(PARENT_CONFIG_PREAMBLE);
    out.push('\n');

    let parents: Vec<String> = rules
        .parent_proxies
        .iter()
        .filter(|p| p.enabled)
        .map(|p| format!("{}:{}", p.address, p.port))
        .collect();
    let parent_list = parents.join(";");

    for rule in &rules.ip_range_rules {
        let range = cidr::expand_ipv4_cidr(rule.network, rule.prefix_len);
        match rule.action {
            RouteAction::Direct => {
                let _ = writeln!(out, "dest_ip={}-{} go_direct=true", range.start, range.end);
            }
            RouteAction::Parent => {
                let _ = writeln!(
                    out,
                    "dest_ip={}-{} parent=\"{parent_list}\" round_robin=strict go_direct=false",
                    range.start, range.end
                );
            }
        }
    }

    for rule in &rules.domain_rules {
        let selector = parent_config_selector(&rule.selector);
        match rule.action {
            RouteAction::Direct => {
                let _ = writeln!(out, "dest_domain={selector} go_direct=true");
            }
            RouteAction::Parent => {
                let _ = writeln!(
                    out,
                    "dest_domain={selector} parent=\"{parent_list}\" round_robin=strict go_direct=false"
                );
            }
        }
    }

    let default_parent = matches!(config.default_action, DefaultAction::Parent) && !parents.is_empty();
    if default_parent {
        let _ = writeln!(
            out,
            "dest_domain=. parent=\"{parent_list}\" round_robin=strict go_direct=false"
        );
    } else {
        let _ = writeln!(out, "dest_domain=. go_direct=true");
    }
    out
}

/// `sni.yaml`'s selector never carries the stored `*.` prefix into a bare
/// leading dot; this only guards against a selector already in that form.
fn sni_fqdn(selector: &str) -> String {
    match selector.strip_prefix('.') {
        Some(rest) => format!("*.{rest}"),
        None => selector.to_owned(),
    }
}

fn render_sni_yaml(rules: &RuleSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "sni:");
    for rule in rules
        .domain_rules
        .iter()
        .filter(|rule| rule.action == RouteAction::Direct)
    {
        let _ = writeln!(out, "  - fqdn: \"{}\"", sni_fqdn(&rule.selector));
        let _ = writeln!(out, "    tunnel_route: direct");
    }
    out
}

fn render_ip_allow_yaml(rules: &RuleSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "ip_allow:");

    for rule in &rules.client_acl_rules {
        let action = match rule.action {
            AclAction::Allow => "set_allow",
            AclAction::Deny => "set_deny",
        };
        let ip_addrs = match rule.network {
            ClientAclNetwork::V4 { network, prefix_len } => {
                let range = cidr::expand_ipv4_cidr(network, prefix_len);
                format!("{}-{}", range.start, range.end)
            }
            ClientAclNetwork::V6 { address } => address.to_string(),
        };
        let _ = writeln!(out, "  - apply: in");
        let _ = writeln!(out, "    ip_addrs: {ip_addrs}");
        let _ = writeln!(out, "    action: {action}");
    }

    let _ = writeln!(out, "  - apply: in");
    let _ = writeln!(out, "    ip_addrs: 0/0");
    let _ = writeln!(out, "    action: set_deny");
    let _ = writeln!(out, "  - apply: in");
    let _ = writeln!(out, "    ip_addrs: ::/0");
    let _ = writeln!(out, "    action: set_deny");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{
        ClientAclRule, ConfigStatus, DomainRule, IpRangeRule, NewConfiguration, ParentProxyEntry,
    };
    use crate::domain::ids::{
        ClientAclRuleId, ConfigId, DomainRuleId, IpRangeRuleId, ParentProxyId, UserId,
    };
    use chrono::Utc;

    fn sample_config() -> Configuration {
        let now = Utc::now();
        let user = UserId::new();
        Configuration {
            id: ConfigId::new(),
            name: "edge-1".into(),
            description: String::new(),
            version: 1,
            default_action: DefaultAction::Direct,
            status: ConfigStatus::Draft,
            fingerprint: None,
            created_by: user,
            created_at: now,
            modified_by: user,
            modified_at: now,
            submitted_by: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
        }
    }

    fn sample_rules() -> RuleSet {
        RuleSet {
            domain_rules: vec![
                DomainRule {
                    id: DomainRuleId::new(),
                    selector: "*.example.com".into(),
                    action: RouteAction::Parent,
                    priority: 0,
                },
                DomainRule {
                    id: DomainRuleId::new(),
                    selector: "direct.example.com".into(),
                    action: RouteAction::Direct,
                    priority: 1,
                },
            ],
            ip_range_rules: vec![IpRangeRule {
                id: IpRangeRuleId::new(),
                network: "10.0.0.0".parse().unwrap(),
                prefix_len: 24,
                action: RouteAction::Direct,
                priority: 0,
            }],
            client_acl_rules: vec![
                ClientAclRule {
                    id: ClientAclRuleId::new(),
                    network: ClientAclNetwork::V4 {
                        network: "192.168.1.0".parse().unwrap(),
                        prefix_len: 24,
                    },
                    action: AclAction::Allow,
                    priority: 0,
                },
                ClientAclRule {
                    id: ClientAclRuleId::new(),
                    network: ClientAclNetwork::V6 {
                        address: "::1".parse().unwrap(),
                    },
                    action: AclAction::Allow,
                    priority: 1,
                },
            ],
            parent_proxies: vec![ParentProxyEntry {
                id: ParentProxyId::new(),
                address: "10.1.1.1".parse().unwrap(),
                port: 8080,
                priority: 0,
                enabled: true,
            }],
        }
    }

    #[test]
    fn compiles_deterministically() {
        let config = sample_config();
        let rules = sample_rules();
        let first = compile(&config, &rules);
        let second = compile(&config, &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn parent_config_includes_preamble_and_wildcard_translation() {
        let artefacts = compile(&sample_config(), &sample_rules());
        assert!(artefacts.parent_config.starts_with("# Localhost\n"));
        assert!(artefacts.parent_config.contains("dest_domain=.example.com"));
        assert!(artefacts.parent_config.contains("10.1.1.1:8080"));
    }

    #[test]
    fn parent_config_includes_ip_range_and_direct_domain_rules() {
        let artefacts = compile(&sample_config(), &sample_rules());
        assert!(artefacts
            .parent_config
            .contains("dest_ip=10.0.0.0-10.0.0.255 go_direct=true"));
        assert!(artefacts
            .parent_config
            .contains("dest_domain=direct.example.com go_direct=true"));
    }

    #[test]
    fn sni_yaml_only_covers_direct_domain_rules() {
        let artefacts = compile(&sample_config(), &sample_rules());
        assert!(!artefacts.sni_yaml.contains("*.example.com"));
        assert!(artefacts.sni_yaml.contains("\"direct.example.com\""));
        assert!(artefacts.sni_yaml.contains("tunnel_route: direct"));
    }

    #[test]
    fn ip_allow_yaml_expands_cidr_and_carries_ipv6_literal() {
        let artefacts = compile(&sample_config(), &sample_rules());
        assert!(artefacts.ip_allow_yaml.contains("192.168.1.0-192.168.1.255"));
        assert!(artefacts.ip_allow_yaml.contains("ip_addrs: ::1"));
        assert!(!artefacts.ip_allow_yaml.contains("10.0.0.0-10.0.0.255"));
    }

    #[test]
    fn ip_allow_yaml_appends_deny_all_floor() {
        let artefacts = compile(&sample_config(), &sample_rules());
        assert!(artefacts.ip_allow_yaml.contains("ip_addrs: 0/0"));
        assert!(artefacts.ip_allow_yaml.contains("ip_addrs: ::/0"));
        assert_eq!(artefacts.ip_allow_yaml.matches("set_deny").count(), 2);
    }

    #[test]
    fn fingerprint_changes_when_rules_change() {
        let config = sample_config();
        let mut rules = sample_rules();
        let before = compile(&config, &rules).fingerprint;
        rules.domain_rules[0].priority = 5;
        let after = compile(&config, &rules).fingerprint;
        assert_ne!(before, after);
    }

    #[test]
    fn unused_new_configuration_fields_are_constructible() {
        let _ = NewConfiguration {
            name: "x".into(),
            description: "y".into(),
            default_action: DefaultAction::Direct,
        };
    }

    proptest::proptest! {
        #[test]
        fn compile_is_deterministic_across_runs(priority in 0_i32..1000) {
            let config = sample_config();
            let mut rules = sample_rules();
            rules.domain_rules[0].priority = priority;
            let a = compile(&config, &rules);
            let b = compile(&config, &rules);
            proptest::prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn parent_config_snapshot() {
        let artefacts = compile(&sample_config(), &sample_rules());
        insta::assert_snapshot!(artefacts.parent_config, @r###"
# Localhost
dest_ip=127.0.0.0-127.255.255.255 go_direct=true
# Link-local
dest_ip=169.254.0.0-169.254.255.255 go_direct=true
# Kubernetes
dest_domain=.svc.cluster.local go_direct=true
dest_domain=.cluster.local go_direct=true
dest_domain=localhost go_direct=true

dest_ip=10.0.0.0-10.0.0.255 go_direct=true
dest_domain=.example.com parent="10.1.1.1:8080" round_robin=strict go_direct=false
dest_domain=direct.example.com go_direct=true
dest_domain=. go_direct=true
"###);
    }

    #[test]
    fn sni_yaml_snapshot() {
        let artefacts = compile(&sample_config(), &sample_rules());
        insta::assert_snapshot!(artefacts.sni_yaml, @r###"
sni:
  - fqdn: "direct.example.com"
    tunnel_route: direct
"###);
    }

    #[test]
    fn ip_allow_yaml_snapshot() {
        let artefacts = compile(&sample_config(), &sample_rules());
        insta::assert_snapshot!(artefacts.ip_allow_yaml, @r###"
ip_allow:
  - apply: in
    ip_addrs: 192.168.1.0-192.168.1.255
    action: set_allow
  - apply: in
    ip_addrs: ::1
    action: set_allow
  - apply: in
    ip_addrs: 0/0
    action: set_deny
  - apply: in
    ip_addrs: ::/0
    action: set_deny
"###);
    }

    #[test]
    fn parent_config_snapshot_with_default_parent_action() {
        let mut config = sample_config();
        config.default_action = DefaultAction::Parent;
        let artefacts = compile(&config, &sample_rules());
        assert!(artefacts
            .parent_config
            .ends_with("dest_domain=. parent=\"10.1.1.1:8080\" round_robin=strict go_direct=false\n"));
    }

    #[test]
    fn default_parent_action_falls_back_to_direct_without_enabled_parents() {
        let mut config = sample_config();
        config.default_action = DefaultAction::Parent;
        let mut rules = sample_rules();
        rules.parent_proxies.clear();
        let artefacts = compile(&config, &rules);
        assert!(artefacts.parent_config.ends_with("dest_domain=. go_direct=true\n"));
    }
}
