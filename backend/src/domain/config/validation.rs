//! Pure validation for configuration rule inputs.
//!
//! Kept dependency-free (no regex crate) so the same checks run identically
//! in the control plane and in property tests: hand-rolled parsing keeps
//! the accepted grammar exact and avoids a second source of truth.

use std::net::Ipv4Addr;

/// Validation failure for a single rule field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleValidationError {
    /// A domain selector was empty, too long, or contained disallowed characters.
    InvalidDomainSelector,
    /// A CIDR prefix length exceeded 32 or the network had host bits set.
    InvalidCidr,
    /// A parent proxy port was 0.
    InvalidPort,
    /// A rule's priority was negative.
    NegativePriority,
}

impl std::fmt::Display for RuleValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDomainSelector => write!(f, "domain selector is invalid"),
            Self::InvalidCidr => write!(f, "CIDR block is invalid"),
            Self::InvalidPort => write!(f, "port must be between 1 and 65535"),
            Self::NegativePriority => write!(f, "priority must not be negative"),
        }
    }
}

impl std::error::Error for RuleValidationError {}

const MAX_SELECTOR_LEN: usize = 253;

/// Validate a domain selector: an exact hostname, or a `*.` wildcard prefix
/// followed by a hostname with at least one label.
///
/// # Errors
///
/// Returns [`RuleValidationError::InvalidDomainSelector`] if the selector is
/// empty, exceeds 253 characters, or contains a label with characters other
/// than ASCII alphanumerics and hyphens.
pub fn validate_domain_selector(raw: &str) -> Result<(), RuleValidationError> {
    let selector = raw.trim();
    if selector.is_empty() || selector.len() > MAX_SELECTOR_LEN {
        return Err(RuleValidationError::InvalidDomainSelector);
    }

    let host_part = selector
        .strip_prefix("*.")
        .unwrap_or(selector);
    if host_part.is_empty() {
        return Err(RuleValidationError::InvalidDomainSelector);
    }

    let labels: Vec<&str> = host_part.split('.').collect();
    if labels.iter().any(|label| !is_valid_label(label)) {
        return Err(RuleValidationError::InvalidDomainSelector);
    }
    Ok(())
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    let bytes = label.as_bytes();
    let starts_or_ends_with_hyphen = bytes.first() == Some(&b'-') || bytes.last() == Some(&b'-');
    if starts_or_ends_with_hyphen {
        return false;
    }
    bytes
        .iter()
        .all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

/// Validate an IPv4 CIDR block, rejecting networks with host bits set
/// (e.g. `10.0.0.5/24`, which should be written `10.0.0.0/24`).
///
/// # Errors
///
/// Returns [`RuleValidationError::InvalidCidr`] if `prefix_len` exceeds 32 or
/// the network has non-zero host bits.
pub fn validate_cidr(network: Ipv4Addr, prefix_len: u8) -> Result<(), RuleValidationError> {
    if prefix_len > 32 {
        return Err(RuleValidationError::InvalidCidr);
    }
    let host_mask: u32 = if prefix_len == 0 {
        u32::MAX
    } else {
        u32::MAX >> prefix_len
    };
    if u32::from(network) & host_mask != 0 {
        return Err(RuleValidationError::InvalidCidr);
    }
    Ok(())
}

/// Validate a TCP port used for parent proxy entries.
///
/// # Errors
///
/// Returns [`RuleValidationError::InvalidPort`] if `port` is zero.
pub const fn validate_port(port: u16) -> Result<(), RuleValidationError> {
    if port == 0 {
        return Err(RuleValidationError::InvalidPort);
    }
    Ok(())
}

/// Validate a rule priority.
///
/// # Errors
///
/// Returns [`RuleValidationError::NegativePriority`] if `priority` is negative.
pub const fn validate_priority(priority: i32) -> Result<(), RuleValidationError> {
    if priority < 0 {
        return Err(RuleValidationError::NegativePriority);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exact_and_wildcard_hostnames() {
        assert!(validate_domain_selector("example.com").is_ok());
        assert!(validate_domain_selector("*.example.com").is_ok());
    }

    #[test]
    fn rejects_empty_and_bad_labels() {
        assert!(validate_domain_selector("").is_err());
        assert!(validate_domain_selector("*.").is_err());
        assert!(validate_domain_selector("-bad.com").is_err());
        assert!(validate_domain_selector("bad-.com").is_err());
        assert!(validate_domain_selector("bad_label.com").is_err());
    }

    #[test]
    fn rejects_cidr_with_host_bits_set() {
        let network: Ipv4Addr = "10.0.0.5".parse().expect("valid ipv4");
        assert_eq!(
            validate_cidr(network, 24),
            Err(RuleValidationError::InvalidCidr)
        );
    }

    #[test]
    fn accepts_well_formed_cidr() {
        let network: Ipv4Addr = "10.0.0.0".parse().expect("valid ipv4");
        assert!(validate_cidr(network, 24).is_ok());
    }

    #[test]
    fn rejects_prefix_over_32() {
        let network: Ipv4Addr = "0.0.0.0".parse().expect("valid ipv4");
        assert_eq!(
            validate_cidr(network, 33),
            Err(RuleValidationError::InvalidCidr)
        );
    }

    #[test]
    fn rejects_zero_port() {
        assert_eq!(validate_port(0), Err(RuleValidationError::InvalidPort));
        assert!(validate_port(8080).is_ok());
    }

    #[test]
    fn rejects_negative_priority() {
        assert_eq!(
            validate_priority(-1),
            Err(RuleValidationError::NegativePriority)
        );
        assert!(validate_priority(0).is_ok());
    }
}
