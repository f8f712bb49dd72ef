//! PostgreSQL-backed `SessionRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::auth::Session;
use crate::domain::ids::{SessionId, UserId};
use crate::domain::ports::{SessionPersistenceError, SessionRepository};

use super::models::{NewSessionRow, SessionRow};
use super::pool::{DbPool, PoolError};
use super::schema::sessions;

/// Diesel-backed implementation of the `SessionRepository` port.
#[derive(Clone)]
pub struct DieselSessionRepository {
    pool: DbPool,
}

impl DieselSessionRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SessionPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            SessionPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> SessionPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => SessionPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            SessionPersistenceError::connection("database connection error")
        }
        _ => SessionPersistenceError::query("database error"),
    }
}

fn row_to_session(row: SessionRow) -> Session {
    Session {
        id: SessionId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        token_hash: row.token_hash,
        created_at: row.created_at,
        expires_at: row.expires_at,
    }
}

#[async_trait]
impl SessionRepository for DieselSessionRepository {
    async fn create(
        &self,
        user_id: UserId,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, SessionPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id = uuid::Uuid::new_v4();
        let created_at = Utc::now();
        let row = NewSessionRow {
            id,
            user_id: user_id.as_uuid(),
            token_hash: &token_hash,
            created_at,
            expires_at,
        };

        diesel::insert_into(sessions::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(Session {
            id: SessionId::from_uuid(id),
            user_id,
            token_hash,
            created_at,
            expires_at,
        })
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, SessionPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<SessionRow> = sessions::table
            .filter(sessions::token_hash.eq(token_hash))
            .filter(sessions::revoked_at.is_null())
            .select(SessionRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_session))
    }

    async fn revoke(&self, id: SessionId) -> Result<(), SessionPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(sessions::table)
            .filter(sessions::id.eq(id.as_uuid()))
            .set(sessions::revoked_at.eq(Some(Utc::now())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn row_to_session_preserves_ids() {
        let user_id = uuid::Uuid::new_v4();
        let session_id = uuid::Uuid::new_v4();
        let now = Utc::now();
        let row = SessionRow {
            id: session_id,
            user_id,
            token_hash: "hash".into(),
            created_at: now,
            expires_at: now,
            revoked_at: None,
        };
        let session = row_to_session(row);
        assert_eq!(session.id.as_uuid(), session_id);
        assert_eq!(session.user_id.as_uuid(), user_id);
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, SessionPersistenceError::Query { .. }));
    }
}
