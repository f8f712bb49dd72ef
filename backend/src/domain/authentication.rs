//! Login and session verification service.
//!
//! Bridges [`crate::domain::auth`]'s pure token/credential primitives with
//! the [`UserRepository`] and [`SessionRepository`] ports. Password hashing
//! uses `bcrypt`; bearer tokens use the SHA-256 scheme in
//! [`crate::domain::auth`] since they carry their own entropy.

use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;

use crate::domain::auth::{hash_token, issue_token, LoginCredentials, Session};
use crate::domain::error::Error;
use crate::domain::ports::{
    SessionPersistenceError, SessionRepository, UserPersistenceError, UserRepository,
};
use crate::domain::user::User;

/// How long an issued session remains valid absent a logout.
const SESSION_LIFETIME: Duration = Duration::hours(12);

/// Successful login result: the account and a token to hand back to the
/// client. The plaintext token is never persisted.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The authenticated account.
    pub user: User,
    /// Bearer token to return in the response body.
    pub token: String,
    /// When the issued session expires.
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Authentication service: password login, bearer verification, logout.
#[derive(Clone)]
pub struct AuthenticationService<UR, SR> {
    users: Arc<UR>,
    sessions: Arc<SR>,
    clock: Arc<dyn Clock>,
    /// Mixed into every bearer-token hash; see [`crate::domain::auth::hash_token`].
    pepper: Arc<str>,
}

impl<UR, SR> AuthenticationService<UR, SR> {
    /// Build a new authentication service from its ports, a clock, and the
    /// `SESSION_TOKEN_PEPPER` mixed into bearer-token hashing.
    pub fn new(users: Arc<UR>, sessions: Arc<SR>, clock: Arc<dyn Clock>, pepper: Arc<str>) -> Self {
        Self {
            users,
            sessions,
            clock,
            pepper,
        }
    }
}

impl<UR, SR> AuthenticationService<UR, SR>
where
    UR: UserRepository,
    SR: SessionRepository,
{
    fn map_user_error(error: UserPersistenceError) -> Error {
        match error {
            UserPersistenceError::Connection { message } | UserPersistenceError::Query { message } => {
                Error::internal(format!("user repository error: {message}"))
            }
            UserPersistenceError::DuplicateEmail { email } => {
                Error::conflict(format!("an account with email {email} already exists"))
            }
        }
    }

    fn map_session_error(error: SessionPersistenceError) -> Error {
        match error {
            SessionPersistenceError::Connection { message }
            | SessionPersistenceError::Query { message } => {
                Error::internal(format!("session repository error: {message}"))
            }
        }
    }

    /// Verify credentials and issue a new bearer session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::unauthorized`] if the account does not exist, is
    /// disabled, or the password does not match. Deliberately returns the
    /// same error for "no such account" and "wrong password" so login
    /// failures do not reveal whether an email is registered.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<LoginOutcome, Error> {
        let email = crate::domain::user::Email::try_new(credentials.email())
            .map_err(|err| Error::bad_request(err.to_string()))?;

        let found = self
            .users
            .find_by_email(&email)
            .await
            .map_err(Self::map_user_error)?;

        let (user, password_hash) = found.ok_or_else(invalid_credentials)?;
        if !user.active {
            return Err(invalid_credentials());
        }

        let matches = bcrypt::verify(credentials.password(), &password_hash)
            .map_err(|err| Error::internal(format!("password verification failed: {err}")))?;
        if !matches {
            return Err(invalid_credentials());
        }

        let issued = issue_token(&self.pepper);
        let now = self.clock.utc();
        let expires_at = now + SESSION_LIFETIME;
        let session = self
            .sessions
            .create(user.id, issued.token_hash.clone(), expires_at)
            .await
            .map_err(Self::map_session_error)?;

        Ok(LoginOutcome {
            user,
            token: issued.token.as_str().to_owned(),
            expires_at: session.expires_at,
        })
    }

    /// Resolve the account behind a bearer token, rejecting expired sessions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::unauthorized`] if the token is unknown, expired, or
    /// its account has since been disabled.
    pub async fn authenticate(&self, token: &str) -> Result<User, Error> {
        let token_hash = hash_token(token, &self.pepper);
        let session = self
            .sessions
            .find_by_token_hash(&token_hash)
            .await
            .map_err(Self::map_session_error)?
            .ok_or_else(invalid_credentials)?;

        if !session.is_valid_at(self.clock.utc()) {
            return Err(invalid_credentials());
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await
            .map_err(Self::map_user_error)?
            .ok_or_else(invalid_credentials)?;

        if !user.active {
            return Err(invalid_credentials());
        }

        Ok(user)
    }

    /// Exchange a still-valid bearer token for a freshly issued one.
    ///
    /// There is a single token type in this service: the value the client
    /// calls its "refresh token" is the same bearer token returned by
    /// [`Self::login`]. Refreshing revokes the presented session and issues
    /// a new one for the same account, rather than extending the existing
    /// session's lifetime in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::unauthorized`] under the same conditions as
    /// [`Self::authenticate`].
    pub async fn refresh(&self, token: &str) -> Result<LoginOutcome, Error> {
        let user = self.authenticate(token).await?;

        let token_hash = hash_token(token, &self.pepper);
        if let Some(session) = self
            .sessions
            .find_by_token_hash(&token_hash)
            .await
            .map_err(Self::map_session_error)?
        {
            self.sessions
                .revoke(session.id)
                .await
                .map_err(Self::map_session_error)?;
        }

        let issued = issue_token(&self.pepper);
        let now = self.clock.utc();
        let expires_at = now + SESSION_LIFETIME;
        let session = self
            .sessions
            .create(user.id, issued.token_hash.clone(), expires_at)
            .await
            .map_err(Self::map_session_error)?;

        Ok(LoginOutcome {
            user,
            token: issued.token.as_str().to_owned(),
            expires_at: session.expires_at,
        })
    }

    /// Revoke a session by bearer token, as on logout. Idempotent: revoking
    /// an already-unknown token is not an error.
    ///
    /// # Errors
    ///
    /// Propagates repository failures as [`Error::internal`].
    pub async fn logout(&self, token: &str) -> Result<(), Error> {
        let token_hash = hash_token(token, &self.pepper);
        if let Some(session) = self
            .sessions
            .find_by_token_hash(&token_hash)
            .await
            .map_err(Self::map_session_error)?
        {
            self.sessions
                .revoke(session.id)
                .await
                .map_err(Self::map_session_error)?;
        }
        Ok(())
    }

    /// Hash a plaintext password for storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::internal`] if `bcrypt` fails to hash the password.
    pub fn hash_password(password: &str) -> Result<String, Error> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|err| Error::internal(format!("password hashing failed: {err}")))
    }
}

fn invalid_credentials() -> Error {
    Error::unauthorized("invalid email or password")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::UserId;
    use crate::domain::ports::{MockSessionRepository, MockUserRepository};
    use crate::domain::user::Role;
    use mockable::DefaultClock;

    fn sample_user(active: bool) -> User {
        User {
            id: UserId::new(),
            email: crate::domain::user::Email::try_new("admin@example.com").unwrap(),
            display_name: "Admin".into(),
            role: Role::Admin,
            active,
        }
    }

    #[tokio::test]
    async fn login_rejects_unknown_email() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        let sessions = MockSessionRepository::new();

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        let credentials = LoginCredentials::try_from_parts("nobody@example.com", "password").unwrap();

        let result = service.login(credentials).await;
        assert_eq!(result.unwrap_err().code(), crate::domain::ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn login_rejects_disabled_account() {
        let hash = AuthenticationService::<MockUserRepository, MockSessionRepository>::hash_password(
            "password",
        )
        .unwrap();
        let mut users = MockUserRepository::new();
        let user = sample_user(false);
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some((user.clone(), hash.clone()))));
        let sessions = MockSessionRepository::new();

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        let credentials = LoginCredentials::try_from_parts("admin@example.com", "password").unwrap();

        let result = service.login(credentials).await;
        assert_eq!(result.unwrap_err().code(), crate::domain::ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn login_issues_session_on_correct_password() {
        let hash = AuthenticationService::<MockUserRepository, MockSessionRepository>::hash_password(
            "correct horse",
        )
        .unwrap();
        let mut users = MockUserRepository::new();
        let user = sample_user(true);
        let expected_id = user.id;
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some((user.clone(), hash.clone()))));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_create().returning(move |user_id, token_hash, expires_at| {
            Ok(Session {
                id: crate::domain::ids::SessionId::new(),
                user_id,
                token_hash,
                created_at: chrono::Utc::now(),
                expires_at,
            })
        });

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        let credentials = LoginCredentials::try_from_parts("admin@example.com", "correct horse").unwrap();

        let outcome = service.login(credentials).await.unwrap();
        assert_eq!(outcome.user.id, expected_id);
        assert!(outcome.token.starts_with("atsctl_"));
    }

    #[tokio::test]
    async fn authenticate_rejects_expired_session() {
        let users = MockUserRepository::new();
        let mut sessions = MockSessionRepository::new();
        let user_id = UserId::new();
        sessions.expect_find_by_token_hash().returning(move |hash| {
            Ok(Some(Session {
                id: crate::domain::ids::SessionId::new(),
                user_id,
                token_hash: hash.to_owned(),
                created_at: chrono::Utc::now() - chrono::Duration::hours(13),
                expires_at: chrono::Utc::now() - chrono::Duration::hours(1),
            }))
        });

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        let result = service.authenticate("atsctl_whatever").await;
        assert_eq!(result.unwrap_err().code(), crate::domain::ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn refresh_issues_a_new_token_and_revokes_the_old_session() {
        let user = sample_user(true);
        let user_id = user.id;
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |_| Ok(Some(user.clone())));

        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(move |hash| {
            Ok(Some(Session {
                id: crate::domain::ids::SessionId::new(),
                user_id,
                token_hash: hash.to_owned(),
                created_at: chrono::Utc::now(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            }))
        });
        sessions.expect_revoke().returning(|_| Ok(()));
        sessions.expect_create().returning(move |user_id, token_hash, expires_at| {
            Ok(Session {
                id: crate::domain::ids::SessionId::new(),
                user_id,
                token_hash,
                created_at: chrono::Utc::now(),
                expires_at,
            })
        });

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        let outcome = service.refresh("atsctl_old").await.unwrap();
        assert_eq!(outcome.user.id, user_id);
        assert!(outcome.token.starts_with("atsctl_"));
    }

    #[tokio::test]
    async fn logout_is_idempotent_for_unknown_token() {
        let users = MockUserRepository::new();
        let mut sessions = MockSessionRepository::new();
        sessions.expect_find_by_token_hash().returning(|_| Ok(None));

        let service = AuthenticationService::new(Arc::new(users), Arc::new(sessions), Arc::new(DefaultClock), Arc::from("pepper"));
        assert!(service.logout("atsctl_unknown").await.is_ok());
    }
}
