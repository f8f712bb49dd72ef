//! Operator account domain model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use crate::domain::ids::UserId;

/// Validation errors returned by [`Email::try_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The email address was empty once trimmed.
    EmptyEmail,
    /// The email address lacked an `@` separating local and domain parts.
    InvalidEmail,
    /// The display name was empty once trimmed.
    EmptyDisplayName,
}

impl std::fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail => write!(f, "email must contain an '@'"),
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// A validated, lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Validate and normalise a raw email address.
    ///
    /// # Errors
    ///
    /// Returns [`UserValidationError::EmptyEmail`] if blank, or
    /// [`UserValidationError::InvalidEmail`] if it has no `@`.
    pub fn try_new(raw: impl Into<String>) -> Result<Self, UserValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if !trimmed.contains('@') {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    /// The normalised email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorisation level granted to an operator account.
///
/// Ordered from least to most privileged: [`Self::Regular`] accounts may
/// manage configurations and view the fleet, [`Self::Admin`] accounts may
/// additionally approve configurations and manage proxies, and [`Self::Root`]
/// accounts may additionally manage other operator accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can author and submit configurations.
    Regular,
    /// Can additionally approve, reject and assign configurations.
    Admin,
    /// Can additionally manage operator accounts.
    Root,
}

impl Role {
    /// Whether this role may approve or reject submitted configurations.
    #[must_use]
    pub const fn can_approve_configs(self) -> bool {
        matches!(self, Self::Admin | Self::Root)
    }

    /// Whether this role may create, disable or delete operator accounts.
    #[must_use]
    pub const fn can_manage_users(self) -> bool {
        matches!(self, Self::Root)
    }
}

/// An operator account able to authenticate against the control plane.
///
/// ## Invariants
/// - `email` is unique across all accounts (enforced by the repository).
/// - `display_name` is non-empty once trimmed of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable account identifier.
    pub id: UserId,
    /// Unique, normalised login email.
    pub email: Email,
    /// Human-readable name shown in the UI and audit log.
    pub display_name: String,
    /// Authorisation level.
    pub role: Role,
    /// Whether the account can currently authenticate.
    pub active: bool,
}

impl User {
    /// Validate a display name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`UserValidationError::EmptyDisplayName`] if blank.
    pub fn validate_display_name(raw: &str) -> Result<String, UserValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rejects_blank() {
        assert_eq!(Email::try_new("   "), Err(UserValidationError::EmptyEmail));
    }

    #[test]
    fn email_rejects_missing_at() {
        assert_eq!(
            Email::try_new("not-an-email"),
            Err(UserValidationError::InvalidEmail)
        );
    }

    #[test]
    fn email_normalises_case() {
        let email = Email::try_new("Admin@Example.COM").expect("valid");
        assert_eq!(email.as_str(), "admin@example.com");
    }

    #[test]
    fn role_ordering_reflects_privilege() {
        assert!(Role::Root > Role::Admin);
        assert!(Role::Admin > Role::Regular);
        assert!(Role::Admin.can_approve_configs());
        assert!(!Role::Regular.can_approve_configs());
        assert!(Role::Root.can_manage_users());
        assert!(!Role::Admin.can_manage_users());
    }

    #[test]
    fn display_name_trims_and_rejects_blank() {
        assert_eq!(User::validate_display_name("  Ada  "), Ok("Ada".to_owned()));
        assert_eq!(
            User::validate_display_name("   "),
            Err(UserValidationError::EmptyDisplayName)
        );
    }
}
