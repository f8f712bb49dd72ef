//! PostgreSQL-backed `AuditLogRepository` implementation using Diesel ORM.

use std::net::IpAddr;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::audit::AuditEntry;
use crate::domain::ids::{AuditId, UserId};
use crate::domain::ports::{AuditListFilter, AuditLogRepository, AuditPersistenceError};

use super::models::{AuditLogRow, NewAuditLogRow};
use super::pool::{DbPool, PoolError};
use super::schema::audit_log;

/// Diesel-backed implementation of the `AuditLogRepository` port.
#[derive(Clone)]
pub struct DieselAuditRepository {
    pool: DbPool,
}

impl DieselAuditRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AuditPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            AuditPersistenceError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> AuditPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => AuditPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            AuditPersistenceError::connection("database connection error")
        }
        _ => AuditPersistenceError::query("database error"),
    }
}

fn row_to_entry(row: AuditLogRow) -> AuditEntry {
    let source_ip = row.source_ip.and_then(|raw| {
        raw.parse::<IpAddr>()
            .map_err(|_| warn!(value = raw, id = %row.id, "stored audit source_ip is invalid"))
            .ok()
    });
    AuditEntry {
        id: AuditId::from_uuid(row.id),
        actor: row.actor.map(UserId::from_uuid),
        action: row.action,
        entity_kind: row.entity_kind,
        entity_id: row.entity_id,
        before: row.before,
        after: row.after,
        source_ip,
        created_at: row.created_at,
    }
}

#[async_trait]
impl AuditLogRepository for DieselAuditRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let source_ip = entry.source_ip.map(|ip| ip.to_string());
        let row = NewAuditLogRow {
            id: entry.id.as_uuid(),
            actor: entry.actor.map(|actor| actor.as_uuid()),
            action: &entry.action,
            entity_kind: &entry.entity_kind,
            entity_id: entry.entity_id,
            before: entry.before.as_ref(),
            after: entry.after.as_ref(),
            source_ip,
            created_at: entry.created_at,
        };

        diesel::insert_into(audit_log::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(())
    }

    async fn list(&self, filter: AuditListFilter) -> Result<Vec<AuditEntry>, AuditPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = audit_log::table
            .select(AuditLogRow::as_select())
            .order_by(audit_log::created_at.desc())
            .into_boxed();

        if let Some(entity_type) = &filter.entity_type {
            query = query.filter(audit_log::entity_kind.eq(entity_type.clone()));
        }
        if let Some(entity_id) = &filter.entity_id {
            if let Ok(id) = entity_id.parse::<Uuid>() {
                query = query.filter(audit_log::entity_id.eq(id));
            } else {
                warn!(entity_id, "audit list filter entity_id is not a valid uuid");
            }
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_log::actor.eq(user_id.as_uuid()));
        }
        if let Some(from) = filter.from {
            query = query.filter(audit_log::created_at.ge(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(audit_log::created_at.le(to));
        }
        if filter.limit > 0 {
            query = query.limit(i64::from(filter.limit));
        }

        let rows: Vec<AuditLogRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    #[rstest]
    fn row_to_entry_parses_valid_source_ip() {
        let row = AuditLogRow {
            id: Uuid::new_v4(),
            actor: None,
            action: "config.create".into(),
            entity_kind: "configuration".into(),
            entity_id: Uuid::new_v4(),
            before: None,
            after: None,
            source_ip: Some("203.0.113.5".into()),
            created_at: Utc::now(),
        };
        let entry = row_to_entry(row);
        assert_eq!(entry.source_ip, Some("203.0.113.5".parse().unwrap()));
    }

    #[rstest]
    fn row_to_entry_drops_malformed_source_ip() {
        let row = AuditLogRow {
            id: Uuid::new_v4(),
            actor: None,
            action: "config.create".into(),
            entity_kind: "configuration".into(),
            entity_id: Uuid::new_v4(),
            before: None,
            after: None,
            source_ip: Some("not-an-ip".into()),
            created_at: Utc::now(),
        };
        let entry = row_to_entry(row);
        assert!(entry.source_ip.is_none());
    }
}
