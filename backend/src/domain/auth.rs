//! Authentication primitives: login credentials and bearer sessions.
//!
//! Keep inbound payload parsing outside the domain by exposing constructors
//! that validate string inputs before a handler talks to a port or service.
//! Sessions are opaque bearer tokens; only a salted hash of the token is
//! ever persisted (see [`crate::domain::ports::session_repository`]).

use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::ids::{SessionId, UserId};

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials used by authentication services.
///
/// ## Invariants
/// - `email` is trimmed and must not be empty after trimming.
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use backend::domain::auth::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts("admin@example.com", "password").unwrap();
/// assert_eq!(creds.email(), "admin@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    ///
    /// # Errors
    ///
    /// Returns [`LoginValidationError::EmptyEmail`] or
    /// [`LoginValidationError::EmptyPassword`] for blank inputs.
    pub fn try_from_parts(
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, LoginValidationError> {
        let email = email.into();
        let normalized = email.trim();
        if normalized.is_empty() {
            return Err(LoginValidationError::EmptyEmail);
        }

        let password = password.into();
        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            email: normalized.to_lowercase(),
            password: Zeroizing::new(password),
        })
    }

    /// Normalised email string suitable for user lookups.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// A freshly minted bearer token and the hash persisted for it.
///
/// The plaintext `token` is returned to the client exactly once, in the
/// login response body; only `token_hash` is stored server-side.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Plaintext token delivered to the client.
    pub token: Zeroizing<String>,
    /// SHA-256 hex digest of `token`, safe to persist and index.
    pub token_hash: String,
}

/// Mint a new opaque bearer token.
///
/// Tokens are 32 bytes of CSPRNG output, hex-encoded, prefixed so log
/// scrapers can redact them on sight. `pepper` is mixed into the stored
/// hash; see [`hash_token`].
#[must_use]
pub fn issue_token(pepper: &str) -> IssuedToken {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = format!("atsctl_{}", hex::encode(bytes));
    let token_hash = hash_token(&token, pepper);
    IssuedToken {
        token: Zeroizing::new(token),
        token_hash,
    }
}

/// Hash a bearer token for lookup/storage.
///
/// Session tokens already carry 256 bits of entropy, so a plain SHA-256
/// digest (rather than a slow password hash) is sufficient here; the
/// operator's actual password uses bcrypt instead. `pepper` (from
/// `SESSION_TOKEN_PEPPER`) is mixed in so a leaked database alone cannot be
/// used to confirm guesses against the token space.
#[must_use]
pub fn hash_token(token: &str, pepper: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pepper.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// An authenticated session resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Stable session identifier.
    pub id: SessionId,
    /// Account the session belongs to.
    pub user_id: UserId,
    /// SHA-256 hash of the bearer token.
    pub token_hash: String,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
    /// When the session expires absent further activity.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use rstest_bdd_macros::{given, then, when};

    const VALID_EMAIL: &str = "admin@example.com";
    const VALID_PASSWORD: &str = "correct horse battery staple";

    #[fixture]
    fn email() -> String {
        VALID_EMAIL.into()
    }

    #[fixture]
    fn password() -> String {
        VALID_PASSWORD.into()
    }

    #[rstest]
    fn rejects_empty_email(password: String) {
        let result = LoginCredentials::try_from_parts("", password);
        assert!(matches!(result, Err(LoginValidationError::EmptyEmail)));
    }

    #[rstest]
    fn normalises_email_case(password: String) {
        let creds = LoginCredentials::try_from_parts("  Admin@Example.com  ", password)
            .expect("email should be trimmed and lower-cased");
        assert_eq!(creds.email(), "admin@example.com");
    }

    #[rstest]
    fn rejects_empty_password(email: String) {
        let result = LoginCredentials::try_from_parts(email, "");
        assert!(matches!(result, Err(LoginValidationError::EmptyPassword)));
    }

    #[test]
    fn issued_tokens_hash_consistently() {
        let issued = issue_token("pepper");
        assert_eq!(hash_token(&issued.token, "pepper"), issued.token_hash);
        assert!(issued.token.starts_with("atsctl_"));
    }

    #[test]
    fn different_peppers_yield_different_hashes() {
        let issued = issue_token("pepper-a");
        assert_ne!(hash_token(&issued.token, "pepper-b"), issued.token_hash);
    }

    #[test]
    fn session_validity_respects_expiry() {
        let now = Utc::now();
        let session = Session {
            id: SessionId::new(),
            user_id: UserId::new(),
            token_hash: hash_token("x", "pepper"),
            created_at: now,
            expires_at: now + chrono::Duration::minutes(5),
        };
        assert!(session.is_valid_at(now));
        assert!(!session.is_valid_at(now + chrono::Duration::minutes(10)));
    }

    #[given("a valid login payload")]
    fn a_valid_login_payload(email: String, password: String) -> (String, String) {
        (email, password)
    }

    #[when("credentials are constructed")]
    fn credentials_are_constructed(
        payload: (String, String),
    ) -> Result<LoginCredentials, LoginValidationError> {
        LoginCredentials::try_from_parts(payload.0, payload.1)
    }

    #[then("the email is preserved")]
    fn the_email_is_preserved(result: Result<LoginCredentials, LoginValidationError>) {
        let creds = result.expect("credentials should be built");
        assert_eq!(creds.email(), VALID_EMAIL);
    }

    #[rstest]
    fn constructing_credentials_happy_path(email: String, password: String) {
        let payload = a_valid_login_payload(email, password);
        let result = credentials_are_constructed(payload);
        the_email_is_preserved(result);
    }
}
