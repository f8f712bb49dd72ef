//! Port for operator account persistence.

use async_trait::async_trait;

use crate::domain::user::{Email, Role};
use crate::domain::{User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// An account with this email already exists.
        DuplicateEmail { email: String } => "an account with email {email} already exists",
    }
}

/// Fields required to create a new operator account.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login email.
    pub email: Email,
    /// Display name shown in the UI and audit log.
    pub display_name: String,
    /// Authorisation level.
    pub role: Role,
    /// Bcrypt hash of the account's password; never the plaintext.
    pub password_hash: String,
}

/// Port for operator account storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new operator account.
    ///
    /// # Errors
    ///
    /// Returns [`UserPersistenceError::DuplicateEmail`] if the email is
    /// already registered.
    async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError>;

    /// Fetch an account by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError>;

    /// Fetch an account and its password hash by email, for login.
    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, UserPersistenceError>;

    /// List all operator accounts.
    async fn list(&self) -> Result<Vec<User>, UserPersistenceError>;

    /// Enable or disable an account.
    async fn set_active(&self, id: UserId, active: bool) -> Result<(), UserPersistenceError>;
}
