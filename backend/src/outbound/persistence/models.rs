//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations; each `diesel_*_repository`
//! module owns the conversion to and from its domain type.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    audit_log, client_acl_rules, configurations, domain_rules, ip_range_rules,
    parent_proxy_entries, proxies, proxy_logs, proxy_stats, sessions, users,
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: bool,
    #[expect(dead_code, reason = "retained for future account-age reporting")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub password_hash: &'a str,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserActiveUpdate {
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[expect(dead_code, reason = "revocation is filtered in the query, not read back")]
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sessions)]
pub(crate) struct NewSessionRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: &'a str,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Configurations and rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = configurations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ConfigurationRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub version: i32,
    pub default_action: String,
    pub status: String,
    pub displaced_at: Option<DateTime<Utc>>,
    pub fingerprint: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_by: Uuid,
    pub modified_at: DateTime<Utc>,
    pub submitted_by: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = configurations)]
pub(crate) struct NewConfigurationRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub description: &'a str,
    pub version: i32,
    pub default_action: &'a str,
    pub status: &'a str,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub modified_by: Uuid,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = configurations)]
pub(crate) struct ConfigurationStatusUpdate<'a> {
    pub status: &'a str,
    pub displaced_at: Option<DateTime<Utc>>,
    pub fingerprint: Option<&'a str>,
    pub submitted_by: Option<Uuid>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = domain_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct DomainRuleRow {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub domain_selector: String,
    pub action: String,
    #[expect(dead_code, reason = "parent proxy chaining at the rule level is not yet surfaced")]
    pub parent_proxy_id: Option<Uuid>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = domain_rules)]
pub(crate) struct NewDomainRuleRow<'a> {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub domain_selector: &'a str,
    pub action: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = ip_range_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IpRangeRuleRow {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub cidr: String,
    pub action: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ip_range_rules)]
pub(crate) struct NewIpRangeRuleRow<'a> {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub cidr: &'a str,
    pub action: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = client_acl_rules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ClientAclRuleRow {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub cidr: String,
    pub action: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = client_acl_rules)]
pub(crate) struct NewClientAclRuleRow<'a> {
    pub id: Uuid,
    pub config_id: Uuid,
    pub priority: i32,
    pub cidr: &'a str,
    pub action: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = parent_proxy_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ParentProxyEntryRow {
    pub id: Uuid,
    pub config_id: Uuid,
    pub host: String,
    pub port: i32,
    pub priority: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = parent_proxy_entries)]
pub(crate) struct NewParentProxyEntryRow<'a> {
    pub id: Uuid,
    pub config_id: Uuid,
    pub host: &'a str,
    pub port: i32,
    pub priority: i32,
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// Proxies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = proxies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProxyRow {
    pub id: Uuid,
    pub hostname: String,
    pub assigned_config: Option<Uuid>,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub registered_ip: String,
    pub observed_fingerprint: Option<String>,
    pub log_capture_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = proxies)]
pub(crate) struct NewProxyRow<'a> {
    pub id: Uuid,
    pub hostname: &'a str,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
    pub registered_ip: &'a str,
}

// ---------------------------------------------------------------------------
// Proxy stats and logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = proxy_stats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProxyStatsRow {
    #[expect(dead_code, reason = "surrogate key, not surfaced in the domain type")]
    pub id: i64,
    pub proxy_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub active_connections: i64,
    pub total_connections: i64,
    pub cache_hits: i64,
    pub cache_misses: i64,
    pub errors: i64,
    pub total_requests: i64,
    pub connect_requests: i64,
    pub responses_2xx: i64,
    pub responses_3xx: i64,
    pub responses_4xx: i64,
    pub responses_5xx: i64,
    pub err_connect_fail: i64,
    pub err_client_abort: i64,
    pub broken_server_conns: i64,
    pub bytes_in: i64,
    pub bytes_out: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = proxy_stats)]
pub(crate) struct NewProxyStatsRow {
    pub proxy_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub active_connections: i64,
    pub total_connections: i64,
    pub cache_hits: i64,
    pub cache_misses: i64,
    pub errors: i64,
    pub total_requests: i64,
    pub connect_requests: i64,
    pub responses_2xx: i64,
    pub responses_3xx: i64,
    pub responses_4xx: i64,
    pub responses_5xx: i64,
    pub err_connect_fail: i64,
    pub err_client_abort: i64,
    pub broken_server_conns: i64,
    pub bytes_in: i64,
    pub bytes_out: i64,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = proxy_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProxyLogRow {
    #[expect(dead_code, reason = "surrogate key, not surfaced in the domain type")]
    pub id: i64,
    pub proxy_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = proxy_logs)]
pub(crate) struct NewProxyLogRow<'a> {
    pub proxy_id: Uuid,
    pub captured_at: DateTime<Utc>,
    pub text: &'a str,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AuditLogRow {
    pub id: Uuid,
    pub actor: Option<Uuid>,
    pub action: String,
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub before: Option<serde_json::Value>,
    pub after: Option<serde_json::Value>,
    pub source_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_log)]
pub(crate) struct NewAuditLogRow<'a> {
    pub id: Uuid,
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub entity_kind: &'a str,
    pub entity_id: Uuid,
    pub before: Option<&'a serde_json::Value>,
    pub after: Option<&'a serde_json::Value>,
    pub source_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}
