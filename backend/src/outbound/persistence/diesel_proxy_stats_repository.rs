//! PostgreSQL-backed `ProxyStatsRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::fleet::ProxySample;
use crate::domain::ids::ProxyId;
use crate::domain::ports::{ProxyStatsPersistenceError, ProxyStatsRepository};

use super::models::NewProxyStatsRow;
use super::pool::{DbPool, PoolError};
use super::schema::proxy_stats;

/// Diesel-backed implementation of the `ProxyStatsRepository` port.
#[derive(Clone)]
pub struct DieselProxyStatsRepository {
    pool: DbPool,
}

impl DieselProxyStatsRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProxyStatsPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ProxyStatsPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> ProxyStatsPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => ProxyStatsPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ProxyStatsPersistenceError::connection("database connection error")
        }
        _ => ProxyStatsPersistenceError::query("database error"),
    }
}

#[async_trait]
impl ProxyStatsRepository for DieselProxyStatsRepository {
    async fn insert_sample(&self, sample: ProxySample) -> Result<(), ProxyStatsPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewProxyStatsRow {
            proxy_id: sample.proxy_id.as_uuid(),
            captured_at: sample.captured_at,
            active_connections: sample.active_connections,
            total_connections: sample.total_connections,
            cache_hits: sample.cache_hits,
            cache_misses: sample.cache_misses,
            errors: sample.errors,
            total_requests: sample.total_requests,
            connect_requests: sample.connect_requests,
            responses_2xx: sample.responses_2xx,
            responses_3xx: sample.responses_3xx,
            responses_4xx: sample.responses_4xx,
            responses_5xx: sample.responses_5xx,
            err_connect_fail: sample.err_connect_fail,
            err_client_abort: sample.err_client_abort,
            broken_server_conns: sample.broken_server_conns,
            bytes_in: sample.bytes_in,
            bytes_out: sample.bytes_out,
        };

        diesel::insert_into(proxy_stats::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(())
    }

    async fn samples_since(
        &self,
        proxy_id: ProxyId,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProxySample>, ProxyStatsPersistenceError> {
        use super::models::ProxyStatsRow;

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ProxyStatsRow> = proxy_stats::table
            .filter(proxy_stats::proxy_id.eq(proxy_id.as_uuid()))
            .filter(proxy_stats::captured_at.ge(since))
            .select(ProxyStatsRow::as_select())
            .order_by(proxy_stats::captured_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ProxySample {
                proxy_id: ProxyId::from_uuid(row.proxy_id),
                captured_at: row.captured_at,
                active_connections: row.active_connections,
                total_connections: row.total_connections,
                cache_hits: row.cache_hits,
                cache_misses: row.cache_misses,
                errors: row.errors,
                total_requests: row.total_requests,
                connect_requests: row.connect_requests,
                responses_2xx: row.responses_2xx,
                responses_3xx: row.responses_3xx,
                responses_4xx: row.responses_4xx,
                responses_5xx: row.responses_5xx,
                err_connect_fail: row.err_connect_fail,
                err_client_abort: row.err_client_abort,
                broken_server_conns: row.broken_server_conns,
                bytes_in: row.bytes_in,
                bytes_out: row.bytes_out,
            })
            .collect())
    }

    async fn purge_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, ProxyStatsPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(proxy_stats::table.filter(proxy_stats::captured_at.lt(cutoff)))
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
    fn diesel_not_found_maps_to_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, ProxyStatsPersistenceError::Query { .. }));
    }

    #[rstest]
    fn pool_checkout_failure_maps_to_connection_error() {
        let err = map_pool_error(PoolError::checkout("pool exhausted"));
        assert!(matches!(err, ProxyStatsPersistenceError::Connection { .. }));
    }
}
