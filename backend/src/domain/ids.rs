//! Strongly typed identifiers shared across the domain.
//!
//! Every entity is keyed by a `Uuid` wrapped in a distinct newtype so
//! repositories and services cannot accidentally swap, say, a `ProxyId` for a
//! `ConfigId` at a call site. Each type derives the same small surface via
//! [`define_id`].

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(UserId, "Identifies an operator account.");
define_id!(SessionId, "Identifies a bearer-token session.");
define_id!(ConfigId, "Identifies a forward-proxy configuration.");
define_id!(DomainRuleId, "Identifies a per-domain routing rule.");
define_id!(IpRangeRuleId, "Identifies an IP range routing rule.");
define_id!(ClientAclRuleId, "Identifies a client ACL rule.");
define_id!(ParentProxyId, "Identifies a parent proxy entry.");
define_id!(ProxyId, "Identifies a fleet member (an ATS instance).");
define_id!(AuditId, "Identifies an audit log entry.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_uuid() {
        let raw = Uuid::new_v4();
        let id = ConfigId::from_uuid(raw);
        assert_eq!(id.as_uuid(), raw);
        assert_eq!(Uuid::from(id), raw);
    }

    #[test]
    fn distinct_ids_are_distinct_types() {
        // Compile-time assertion: this would fail to compile if the macro
        // collapsed two ids to the same type.
        let config = ConfigId::new();
        let proxy = ProxyId::new();
        assert_ne!(config.as_uuid(), proxy.as_uuid());
    }

    #[test]
    fn parses_from_str() {
        let raw = Uuid::new_v4();
        let parsed: ProxyId = raw.to_string().parse().expect("valid uuid");
        assert_eq!(parsed.as_uuid(), raw);
    }
}
