//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ids::UserId;
use crate::domain::ports::{NewUser, UserPersistenceError, UserRepository};
use crate::domain::user::{Email, Role, User};

use super::models::{NewUserRow, UserActiveUpdate, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            UserPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> UserPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => UserPersistenceError::query("record not found"),
        DieselError::QueryBuilderError(_) => UserPersistenceError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            UserPersistenceError::duplicate_email(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UserPersistenceError::connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => UserPersistenceError::query("database error"),
        _ => UserPersistenceError::query("database error"),
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::Regular => "regular",
        Role::Admin => "admin",
        Role::Root => "root",
    }
}

fn role_from_str(raw: &str, user_id: uuid::Uuid) -> Role {
    match raw {
        "admin" => Role::Admin,
        "root" => Role::Root,
        "regular" => Role::Regular,
        other => {
            tracing::warn!(value = other, %user_id, "unrecognised role, defaulting to Regular");
            Role::Regular
        }
    }
}

fn row_to_user(row: UserRow) -> Result<User, UserPersistenceError> {
    let role = role_from_str(&row.role, row.id);
    let email = Email::try_new(row.email)
        .map_err(|err| UserPersistenceError::query(format!("stored email is invalid: {err}")))?;
    Ok(User {
        id: UserId::from_uuid(row.id),
        email,
        display_name: row.display_name,
        role,
        active: row.active,
    })
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();
        let role_str = role_to_str(new_user.role);
        let row = NewUserRow {
            id,
            email: new_user.email.as_str(),
            display_name: &new_user.display_name,
            role: role_str,
            password_hash: &new_user.password_hash,
            active: true,
            created_at: now,
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(User {
            id: UserId::from_uuid(id),
            email: new_user.email,
            display_name: new_user.display_name,
            role: new_user.role,
            active: true,
        })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id.as_uuid()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let password_hash = row.password_hash.clone();
        let user = row_to_user(row)?;
        Ok(Some((user, password_hash)))
    }

    async fn list(&self) -> Result<Vec<User>, UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<UserRow> = users::table
            .select(UserRow::as_select())
            .order_by(users::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_user).collect()
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<(), UserPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(users::table)
            .filter(users::id.eq(id.as_uuid()))
            .set(&UserActiveUpdate { active })
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
    fn pool_error_maps_to_connection_error() {
        let repo_err = map_pool_error(PoolError::checkout("connection refused"));
        assert!(matches!(repo_err, UserPersistenceError::Connection { .. }));
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let repo_err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(repo_err, UserPersistenceError::Query { .. }));
    }

    #[rstest]
    #[case("admin", Role::Admin)]
    #[case("root", Role::Root)]
    #[case("regular", Role::Regular)]
    #[case("nonsense", Role::Regular)]
    fn role_from_str_falls_back_to_regular(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(role_from_str(raw, uuid::Uuid::nil()), expected);
    }

    #[rstest]
    fn row_to_user_round_trips_fields() {
        let row = UserRow {
            id: uuid::Uuid::new_v4(),
            email: "admin@example.com".into(),
            display_name: "Admin".into(),
            role: "admin".into(),
            password_hash: "hash".into(),
            active: true,
            created_at: chrono::Utc::now(),
        };
        let user = row_to_user(row).expect("valid row");
        assert_eq!(user.email.as_str(), "admin@example.com");
        assert_eq!(user.role, Role::Admin);
    }
}
