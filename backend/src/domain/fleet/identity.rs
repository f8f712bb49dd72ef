//! Pure identity resolution for fleet registration.
//!
//! Whether a registering hostname is a brand new proxy, a previously seen
//! one reconnecting, or a different proxy colliding with a known hostname is
//! a pure function of the existing record and the caller's claimed identity,
//! kept here so it can be unit tested without a database.

use std::net::IpAddr;

use super::proxy::Proxy;
use crate::domain::ids::ProxyId;

/// What the repository should do for an incoming registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterDecision {
    /// No proxy with this hostname exists; create one.
    Create,
    /// A proxy with this hostname already exists and the caller is either
    /// that proxy or the prior record is no longer live; reuse its identity
    /// and refresh its liveness fields.
    Reuse,
    /// A proxy with this hostname already exists, is online, and the caller
    /// presents neither its id nor its registered IP: a different proxy has
    /// claimed the same hostname.
    Conflict,
}

/// Decide how to handle a registration given any existing record for the
/// same hostname and the identity the caller presents.
///
/// A second registration for a known hostname is a `Reuse` only if the
/// prior record is offline, or the caller presents the same `proxy_id`, or
/// the same `registered_ip` as the current record; otherwise it is a
/// `Conflict`.
#[must_use]
pub fn resolve_register_decision(
    existing: Option<&Proxy>,
    incoming_proxy_id: Option<ProxyId>,
    incoming_ip: IpAddr,
) -> RegisterDecision {
    let Some(existing) = existing else {
        return RegisterDecision::Create;
    };
    let same_identity = !existing.is_online
        || incoming_proxy_id == Some(existing.id)
        || incoming_ip == existing.registered_ip;
    if same_identity {
        RegisterDecision::Reuse
    } else {
        RegisterDecision::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fleet::proxy::Proxy;
    use crate::domain::ids::ProxyId;
    use chrono::Utc;

    fn sample_proxy(is_online: bool) -> Proxy {
        Proxy {
            id: ProxyId::new(),
            hostname: "edge-1".into(),
            assigned_config: None,
            is_online,
            last_seen: Utc::now(),
            registered_ip: "10.0.0.1".parse().unwrap(),
            observed_fingerprint: None,
            log_capture_deadline: None,
        }
    }

    #[test]
    fn creates_when_no_existing_record() {
        let decision = resolve_register_decision(None, None, "10.0.0.1".parse().unwrap());
        assert_eq!(decision, RegisterDecision::Create);
    }

    #[test]
    fn reuses_when_prior_record_is_offline() {
        let proxy = sample_proxy(false);
        let decision =
            resolve_register_decision(Some(&proxy), Some(ProxyId::new()), "10.0.0.2".parse().unwrap());
        assert_eq!(decision, RegisterDecision::Reuse);
    }

    #[test]
    fn reuses_when_proxy_id_matches() {
        let proxy = sample_proxy(true);
        let decision =
            resolve_register_decision(Some(&proxy), Some(proxy.id), "10.0.0.2".parse().unwrap());
        assert_eq!(decision, RegisterDecision::Reuse);
    }

    #[test]
    fn reuses_when_registered_ip_matches() {
        let proxy = sample_proxy(true);
        let decision = resolve_register_decision(Some(&proxy), None, proxy.registered_ip);
        assert_eq!(decision, RegisterDecision::Reuse);
    }

    #[test]
    fn conflicts_when_online_with_a_different_identity() {
        let proxy = sample_proxy(true);
        let decision = resolve_register_decision(
            Some(&proxy),
            Some(ProxyId::new()),
            "10.0.0.9".parse().unwrap(),
        );
        assert_eq!(decision, RegisterDecision::Conflict);
    }
}
