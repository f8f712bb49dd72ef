//! Port for bearer-token session persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::auth::Session;
use crate::domain::ids::{SessionId, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by session repository adapters.
    pub enum SessionPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "session repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "session repository query failed: {message}",
    }
}

/// Port for session storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a newly issued session.
    async fn create(
        &self,
        user_id: UserId,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionPersistenceError>;

    /// Look up a session by the hash of its bearer token.
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, SessionPersistenceError>;

    /// Revoke a session, e.g. on logout.
    async fn revoke(&self, id: SessionId) -> Result<(), SessionPersistenceError>;
}
