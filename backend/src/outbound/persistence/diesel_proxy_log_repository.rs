//! PostgreSQL-backed `ProxyLogRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::fleet::LogLine;
use crate::domain::ids::ProxyId;
use crate::domain::ports::{ProxyLogPersistenceError, ProxyLogRepository};

use super::models::{NewProxyLogRow, ProxyLogRow};
use super::pool::{DbPool, PoolError};
use super::schema::proxy_logs;

/// Diesel-backed implementation of the `ProxyLogRepository` port.
#[derive(Clone)]
pub struct DieselProxyLogRepository {
    pool: DbPool,
}

impl DieselProxyLogRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProxyLogPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ProxyLogPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> ProxyLogPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => ProxyLogPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ProxyLogPersistenceError::connection("database connection error")
        }
        _ => ProxyLogPersistenceError::query("database error"),
    }
}

fn row_to_line(row: ProxyLogRow) -> LogLine {
    LogLine {
        proxy_id: ProxyId::from_uuid(row.proxy_id),
        captured_at: row.captured_at,
        text: row.text,
    }
}

#[async_trait]
impl ProxyLogRepository for DieselProxyLogRepository {
    async fn append(
        &self,
        proxy_id: ProxyId,
        lines: Vec<LogLine>,
    ) -> Result<(), ProxyLogPersistenceError> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<NewProxyLogRow<'_>> = lines
            .iter()
            .map(|line| NewProxyLogRow {
                proxy_id: proxy_id.as_uuid(),
                captured_at: line.captured_at,
                text: &line.text,
            })
            .collect();

        diesel::insert_into(proxy_logs::table)
            .values(&rows)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(())
    }

    async fn list(
        &self,
        proxy_id: ProxyId,
        limit: u32,
    ) -> Result<Vec<LogLine>, ProxyLogPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ProxyLogRow> = proxy_logs::table
            .filter(proxy_logs::proxy_id.eq(proxy_id.as_uuid()))
            .select(ProxyLogRow::as_select())
            .order_by(proxy_logs::captured_at.desc())
            .limit(i64::from(limit))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(row_to_line).collect())
    }

    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProxyLogPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(proxy_logs::table.filter(proxy_logs::captured_at.lt(cutoff)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn row_to_line_preserves_text() {
        let row = ProxyLogRow {
            id: 1,
            proxy_id: uuid::Uuid::new_v4(),
            captured_at: Utc::now(),
            text: "hello".into(),
        };
        let line = row_to_line(row);
        assert_eq!(line.text, "hello");
    }

    #[rstest]
    fn diesel_not_found_maps_to_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, ProxyLogPersistenceError::Query { .. }));
    }
}
