//! SHA-256 fingerprinting of compiled configuration artefacts.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of the concatenation of the three
/// compiled artefacts, in a fixed order, separated by a newline.
///
/// Using one digest over all three files (rather than one per file) means a
/// sidecar can detect drift in any artefact with a single comparison
/// against the value the control plane returns from `GET /sync`.
#[must_use]
pub fn fingerprint(parent_config: &str, sni_yaml: &str, ip_allow_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent_config.as_bytes());
    hasher.update(b"\n");
    hasher.update(sni_yaml.as_bytes());
    hasher.update(b"\n");
    hasher.update(ip_allow_yaml.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        let a = fingerprint("p", "s", "i");
        let b = fingerprint("p", "s", "i");
        assert_eq!(a, b);
    }

    #[test]
    fn changes_when_any_input_changes() {
        let base = fingerprint("p", "s", "i");
        assert_ne!(base, fingerprint("p2", "s", "i"));
        assert_ne!(base, fingerprint("p", "s2", "i"));
        assert_ne!(base, fingerprint("p", "s", "i2"));
    }

    #[test]
    fn is_64_hex_characters() {
        let digest = fingerprint("a", "b", "c");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
