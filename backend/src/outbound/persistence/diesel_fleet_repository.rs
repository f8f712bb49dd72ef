//! PostgreSQL-backed `ProxyCommand`/`ProxyQuery` implementation using Diesel ORM.

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::fleet::Proxy;
use crate::domain::ids::{ConfigId, ProxyId};
use crate::domain::ports::{FleetPersistenceError, ProxyCommand, ProxyQuery, RegisterOutcome};

use super::models::{NewProxyRow, ProxyRow};
use super::pool::{DbPool, PoolError};
use super::schema::proxies;

/// Diesel-backed implementation of the fleet registry ports.
#[derive(Clone)]
pub struct DieselFleetRepository {
    pool: DbPool,
}

impl DieselFleetRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FleetPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            FleetPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> FleetPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => FleetPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            FleetPersistenceError::connection("database connection error")
        }
        _ => FleetPersistenceError::query("database error"),
    }
}

fn row_to_proxy(row: ProxyRow) -> Result<Proxy, FleetPersistenceError> {
    let registered_ip: IpAddr = row
        .registered_ip
        .parse()
        .map_err(|_| FleetPersistenceError::query("stored registered_ip is not a valid address"))?;
    Ok(Proxy {
        id: ProxyId::from_uuid(row.id),
        hostname: row.hostname,
        assigned_config: row.assigned_config.map(ConfigId::from_uuid),
        is_online: row.is_online,
        last_seen: row.last_seen,
        registered_ip,
        observed_fingerprint: row.observed_fingerprint,
        log_capture_deadline: row.log_capture_deadline,
    })
}

#[async_trait]
impl ProxyCommand for DieselFleetRepository {
    async fn register(
        &self,
        hostname: String,
        registered_ip: IpAddr,
        now: DateTime<Utc>,
    ) -> Result<(Proxy, RegisterOutcome), FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let existing: Option<ProxyRow> = proxies::table
            .filter(proxies::hostname.eq(&hostname))
            .select(ProxyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        if let Some(row) = existing {
            let id = row.id;
            diesel::update(proxies::table)
                .filter(proxies::id.eq(id))
                .set((
                    proxies::is_online.eq(true),
                    proxies::last_seen.eq(now),
                    proxies::registered_ip.eq(registered_ip.to_string()),
                ))
                .execute(&mut conn)
                .await
                .map_err(map_diesel_error)?;

            let updated: ProxyRow = proxies::table
                .filter(proxies::id.eq(id))
                .select(ProxyRow::as_select())
                .first(&mut conn)
                .await
                .map_err(map_diesel_error)?;
            return Ok((row_to_proxy(updated)?, RegisterOutcome::Reused));
        }

        let id = uuid::Uuid::new_v4();
        let ip_string = registered_ip.to_string();
        let new_row = NewProxyRow {
            id,
            hostname: &hostname,
            is_online: true,
            last_seen: now,
            registered_ip: &ip_string,
        };
        diesel::insert_into(proxies::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok((
            Proxy {
                id: ProxyId::from_uuid(id),
                hostname,
                assigned_config: None,
                is_online: true,
                last_seen: now,
                registered_ip,
                observed_fingerprint: None,
                log_capture_deadline: None,
            },
            RegisterOutcome::Created,
        ))
    }

    async fn record_poll(
        &self,
        id: ProxyId,
        observed_fingerprint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(proxies::table)
            .filter(proxies::id.eq(id.as_uuid()))
            .set((
                proxies::is_online.eq(true),
                proxies::last_seen.eq(now),
                proxies::observed_fingerprint.eq(observed_fingerprint),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        self.fetch_one(&mut conn, id).await
    }

    async fn record_ack(
        &self,
        id: ProxyId,
        fingerprint: String,
        now: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(proxies::table)
            .filter(proxies::id.eq(id.as_uuid()))
            .set((
                proxies::observed_fingerprint.eq(Some(fingerprint)),
                proxies::last_seen.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        self.fetch_one(&mut conn, id).await
    }

    async fn extend_capture_deadline(
        &self,
        id: ProxyId,
        capture_until: DateTime<Utc>,
    ) -> Result<Proxy, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(proxies::table)
            .filter(proxies::id.eq(id.as_uuid()))
            .set(proxies::log_capture_deadline.eq(Some(capture_until)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        self.fetch_one(&mut conn, id).await
    }

    async fn assign_config(
        &self,
        id: ProxyId,
        config_id: Option<ConfigId>,
    ) -> Result<Proxy, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::update(proxies::table)
            .filter(proxies::id.eq(id.as_uuid()))
            .set(proxies::assigned_config.eq(config_id.map(|c| c.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        self.fetch_one(&mut conn, id).await
    }

    async fn mark_offline_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(proxies::table)
            .filter(proxies::last_seen.lt(cutoff))
            .filter(proxies::is_online.eq(true))
            .set(proxies::is_online.eq(false))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(updated as u64)
    }

    async fn delete(&self, id: ProxyId) -> Result<(), FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::delete(proxies::table.filter(proxies::id.eq(id.as_uuid())))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(())
    }
}

impl DieselFleetRepository {
    async fn fetch_one(
        &self,
        conn: &mut diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        id: ProxyId,
    ) -> Result<Proxy, FleetPersistenceError> {
        let row: ProxyRow = proxies::table
            .filter(proxies::id.eq(id.as_uuid()))
            .select(ProxyRow::as_select())
            .first(conn)
            .await
            .map_err(map_diesel_error)?;
        row_to_proxy(row)
    }
}

#[async_trait]
impl ProxyQuery for DieselFleetRepository {
    async fn find_by_id(&self, id: ProxyId) -> Result<Option<Proxy>, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ProxyRow> = proxies::table
            .filter(proxies::id.eq(id.as_uuid()))
            .select(ProxyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_proxy).transpose()
    }

    async fn find_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<Proxy>, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<ProxyRow> = proxies::table
            .filter(proxies::hostname.eq(hostname))
            .select(ProxyRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_proxy).transpose()
    }

    async fn list(&self) -> Result<Vec<Proxy>, FleetPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<ProxyRow> = proxies::table
            .select(ProxyRow::as_select())
            .order_by(proxies::hostname.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_proxy).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_row() -> ProxyRow {
        ProxyRow {
            id: uuid::Uuid::new_v4(),
            hostname: "edge-1".into(),
            assigned_config: None,
            is_online: true,
            last_seen: Utc::now(),
            registered_ip: "10.0.0.1".into(),
            observed_fingerprint: None,
            log_capture_deadline: None,
        }
    }

    #[rstest]
    fn row_to_proxy_parses_registered_ip() {
        let proxy = row_to_proxy(sample_row()).expect("valid row");
        assert_eq!(proxy.registered_ip, "10.0.0.1".parse::<IpAddr>().unwrap());
    }

    #[rstest]
    fn row_to_proxy_rejects_malformed_ip() {
        let mut row = sample_row();
        row.registered_ip = "not-an-ip".into();
        let result = row_to_proxy(row);
        assert!(result.is_err());
    }
}
