//! PostgreSQL-backed `ConfigCommand`/`ConfigQuery` implementation using Diesel ORM.
//!
//! A configuration's rules live across four child tables (`domain_rules`,
//! `ip_range_rules`, `client_acl_rules`, `parent_proxy_entries`); this
//! repository assembles them into a single [`RuleSet`] on read and replaces
//! them wholesale on write. Status transitions and the approve-time proxy
//! reassignment run inside a single transaction so no proxy is ever left
//! pointing at two configurations.

use std::net::{Ipv4Addr, Ipv6Addr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::config::{
    AclAction, ClientAclNetwork, ClientAclRule, Configuration, ConfigStatus, ConfigurationWithRules,
    DefaultAction, DomainRule, IpRangeRule, NewConfiguration, ParentProxyEntry, RouteAction, RuleSet,
};
use crate::domain::ids::{
    ClientAclRuleId, ConfigId, DomainRuleId, IpRangeRuleId, ParentProxyId, ProxyId, UserId,
};
use crate::domain::ports::{
    ApproveOutcome, ConfigCommand, ConfigListFilter, ConfigPersistenceError, ConfigQuery,
};

use super::models::{
    ClientAclRuleRow, ConfigurationRow, ConfigurationStatusUpdate, DomainRuleRow, IpRangeRuleRow,
    NewClientAclRuleRow, NewConfigurationRow, NewDomainRuleRow, NewIpRangeRuleRow,
    NewParentProxyEntryRow, ParentProxyEntryRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{client_acl_rules, configurations, domain_rules, ip_range_rules, parent_proxy_entries, proxies};

/// Diesel-backed implementation of the configuration ports.
#[derive(Clone)]
pub struct DieselConfigRepository {
    pool: DbPool,
}

impl DieselConfigRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ConfigPersistenceError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ConfigPersistenceError::connection(message)
        }
    }
}

/// Errors that can surface from inside a transaction closure: either a raw
/// Diesel failure, or one of the two outcomes the lifecycle guards care
/// about. Diesel requires the closure's error type to implement
/// `From<diesel::result::Error>` so `?` keeps working on ordinary queries.
enum TxError {
    Diesel(diesel::result::Error),
    NotFound(ConfigId),
    StatusMismatch { expected: String, actual: String },
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_tx_error(error: TxError) -> ConfigPersistenceError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error),
        TxError::NotFound(id) => ConfigPersistenceError::not_found(id.to_string()),
        TxError::StatusMismatch { expected, actual } => {
            ConfigPersistenceError::status_mismatch(expected, actual)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> ConfigPersistenceError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error_type = %std::any::type_name_of_val(&error), "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => ConfigPersistenceError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ConfigPersistenceError::connection("database connection error")
        }
        _ => ConfigPersistenceError::query("database error"),
    }
}

// ---------------------------------------------------------------------------
// Enum <-> string mappings
// ---------------------------------------------------------------------------

fn default_action_to_str(action: DefaultAction) -> &'static str {
    match action {
        DefaultAction::Direct => "direct",
        DefaultAction::Parent => "parent",
    }
}

fn default_action_from_str(raw: &str, config_id: Uuid) -> DefaultAction {
    match raw {
        "parent" => DefaultAction::Parent,
        "direct" => DefaultAction::Direct,
        other => {
            warn!(value = other, %config_id, "unrecognised default_action, defaulting to Direct");
            DefaultAction::Direct
        }
    }
}

fn route_action_to_str(action: RouteAction) -> &'static str {
    match action {
        RouteAction::Direct => "direct",
        RouteAction::Parent => "parent",
    }
}

fn route_action_from_str(raw: &str, rule_id: Uuid) -> RouteAction {
    match raw {
        "parent" => RouteAction::Parent,
        "direct" => RouteAction::Direct,
        other => {
            warn!(value = other, %rule_id, "unrecognised route action, defaulting to Direct");
            RouteAction::Direct
        }
    }
}

fn acl_action_to_str(action: AclAction) -> &'static str {
    match action {
        AclAction::Allow => "allow",
        AclAction::Deny => "deny",
    }
}

fn acl_action_from_str(raw: &str, rule_id: Uuid) -> AclAction {
    match raw {
        "allow" => AclAction::Allow,
        "deny" => AclAction::Deny,
        other => {
            warn!(value = other, %rule_id, "unrecognised acl action, defaulting to Deny");
            AclAction::Deny
        }
    }
}

const STATUS_DRAFT: &str = "draft";
const STATUS_PENDING_APPROVAL: &str = "pending_approval";
const STATUS_ACTIVE: &str = "active";
const STATUS_DISPLACED: &str = "displaced";

fn status_from_parts(raw: &str, displaced_at: Option<DateTime<Utc>>, config_id: Uuid) -> ConfigStatus {
    match raw {
        STATUS_DRAFT => ConfigStatus::Draft,
        STATUS_PENDING_APPROVAL => ConfigStatus::PendingApproval,
        STATUS_ACTIVE => ConfigStatus::Active,
        STATUS_DISPLACED => ConfigStatus::Displaced {
            previously_active_at: displaced_at.unwrap_or_else(Utc::now),
        },
        other => {
            warn!(value = other, %config_id, "unrecognised configuration status, defaulting to Draft");
            ConfigStatus::Draft
        }
    }
}

fn cidr_to_string(network: Ipv4Addr, prefix_len: u8) -> String {
    format!("{network}/{prefix_len}")
}

fn cidr_from_string(raw: &str, rule_id: Uuid) -> Option<(Ipv4Addr, u8)> {
    let (addr, prefix) = raw.split_once('/')?;
    let network = addr.parse().ok()?;
    let prefix_len = prefix.parse().ok()?;
    if prefix_len > 32 {
        warn!(%rule_id, cidr = raw, "cidr prefix length out of range");
        return None;
    }
    Some((network, prefix_len))
}

fn acl_network_to_string(network: ClientAclNetwork) -> String {
    match network {
        ClientAclNetwork::V4 { network, prefix_len } => format!("{network}/{prefix_len}"),
        ClientAclNetwork::V6 { address } => address.to_string(),
    }
}

fn acl_network_from_string(raw: &str, rule_id: Uuid) -> Option<ClientAclNetwork> {
    if let Some((addr, prefix)) = raw.split_once('/') {
        let network: Ipv4Addr = addr.parse().ok()?;
        let prefix_len: u8 = prefix.parse().ok()?;
        if prefix_len > 32 {
            warn!(%rule_id, cidr = raw, "cidr prefix length out of range");
            return None;
        }
        return Some(ClientAclNetwork::V4 { network, prefix_len });
    }
    match raw.parse::<Ipv6Addr>() {
        Ok(address) => Some(ClientAclNetwork::V6 { address }),
        Err(_) => {
            warn!(%rule_id, value = raw, "client acl network is neither a cidr nor an ipv6 literal");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Row <-> domain conversions
// ---------------------------------------------------------------------------

fn row_to_configuration(row: ConfigurationRow) -> Configuration {
    let status = status_from_parts(&row.status, row.displaced_at, row.id);
    Configuration {
        id: ConfigId::from_uuid(row.id),
        name: row.name,
        description: row.description,
        version: row.version,
        default_action: default_action_from_str(&row.default_action, row.id),
        status,
        fingerprint: row.fingerprint,
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
        modified_by: UserId::from_uuid(row.modified_by),
        modified_at: row.modified_at,
        submitted_by: row.submitted_by.map(UserId::from_uuid),
        submitted_at: row.submitted_at,
        approved_by: row.approved_by.map(UserId::from_uuid),
        approved_at: row.approved_at,
    }
}

fn row_to_domain_rule(row: DomainRuleRow) -> DomainRule {
    DomainRule {
        id: DomainRuleId::from_uuid(row.id),
        selector: row.domain_selector,
        action: route_action_from_str(&row.action, row.id),
        priority: row.priority,
    }
}

fn row_to_ip_range_rule(row: IpRangeRuleRow) -> Option<IpRangeRule> {
    let (network, prefix_len) = cidr_from_string(&row.cidr, row.id)?;
    Some(IpRangeRule {
        id: IpRangeRuleId::from_uuid(row.id),
        network,
        prefix_len,
        action: route_action_from_str(&row.action, row.id),
        priority: row.priority,
    })
}

fn row_to_client_acl_rule(row: ClientAclRuleRow) -> Option<ClientAclRule> {
    let network = acl_network_from_string(&row.cidr, row.id)?;
    Some(ClientAclRule {
        id: ClientAclRuleId::from_uuid(row.id),
        network,
        action: acl_action_from_str(&row.action, row.id),
        priority: row.priority,
    })
}

fn row_to_parent_proxy_entry(row: ParentProxyEntryRow) -> Option<ParentProxyEntry> {
    let address = row.host.parse().ok().or_else(|| {
        warn!(id = %row.id, host = row.host, "parent proxy host is not a valid IPv4 address");
        None
    })?;
    Some(ParentProxyEntry {
        id: ParentProxyId::from_uuid(row.id),
        address,
        port: row.port as u16,
        priority: row.priority,
        enabled: row.enabled,
    })
}

async fn assemble_rule_set(
    conn: &mut diesel_async::pooled_connection::bb8::PooledConnection<
        '_,
        diesel_async::AsyncPgConnection,
    >,
    config_id: Uuid,
) -> Result<RuleSet, diesel::result::Error> {
    let domain_rows: Vec<DomainRuleRow> = domain_rules::table
        .filter(domain_rules::config_id.eq(config_id))
        .select(DomainRuleRow::as_select())
        .load(conn)
        .await?;
    let ip_range_rows: Vec<IpRangeRuleRow> = ip_range_rules::table
        .filter(ip_range_rules::config_id.eq(config_id))
        .select(IpRangeRuleRow::as_select())
        .load(conn)
        .await?;
    let client_acl_rows: Vec<ClientAclRuleRow> = client_acl_rules::table
        .filter(client_acl_rules::config_id.eq(config_id))
        .select(ClientAclRuleRow::as_select())
        .load(conn)
        .await?;
    let parent_proxy_rows: Vec<ParentProxyEntryRow> = parent_proxy_entries::table
        .filter(parent_proxy_entries::config_id.eq(config_id))
        .select(ParentProxyEntryRow::as_select())
        .load(conn)
        .await?;

    let mut rule_set = RuleSet {
        domain_rules: domain_rows.into_iter().map(row_to_domain_rule).collect(),
        ip_range_rules: ip_range_rows
            .into_iter()
            .filter_map(row_to_ip_range_rule)
            .collect(),
        client_acl_rules: client_acl_rows
            .into_iter()
            .filter_map(row_to_client_acl_rule)
            .collect(),
        parent_proxies: parent_proxy_rows
            .into_iter()
            .filter_map(row_to_parent_proxy_entry)
            .collect(),
    };
    rule_set.sort_deterministically();
    Ok(rule_set)
}

async fn replace_rule_rows(
    conn: &mut diesel_async::pooled_connection::bb8::PooledConnection<
        '_,
        diesel_async::AsyncPgConnection,
    >,
    config_id: Uuid,
    rules: &RuleSet,
) -> Result<(), diesel::result::Error> {
    diesel::delete(domain_rules::table.filter(domain_rules::config_id.eq(config_id)))
        .execute(conn)
        .await?;
    diesel::delete(ip_range_rules::table.filter(ip_range_rules::config_id.eq(config_id)))
        .execute(conn)
        .await?;
    diesel::delete(client_acl_rules::table.filter(client_acl_rules::config_id.eq(config_id)))
        .execute(conn)
        .await?;
    diesel::delete(parent_proxy_entries::table.filter(parent_proxy_entries::config_id.eq(config_id)))
        .execute(conn)
        .await?;

    if !rules.domain_rules.is_empty() {
        let rows: Vec<NewDomainRuleRow<'_>> = rules
            .domain_rules
            .iter()
            .map(|rule| NewDomainRuleRow {
                id: rule.id.as_uuid(),
                config_id,
                priority: rule.priority,
                domain_selector: &rule.selector,
                action: route_action_to_str(rule.action),
            })
            .collect();
        diesel::insert_into(domain_rules::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    if !rules.ip_range_rules.is_empty() {
        let cidrs: Vec<String> = rules
            .ip_range_rules
            .iter()
            .map(|rule| cidr_to_string(rule.network, rule.prefix_len))
            .collect();
        let rows: Vec<NewIpRangeRuleRow<'_>> = rules
            .ip_range_rules
            .iter()
            .zip(cidrs.iter())
            .map(|(rule, cidr)| NewIpRangeRuleRow {
                id: rule.id.as_uuid(),
                config_id,
                priority: rule.priority,
                cidr,
                action: route_action_to_str(rule.action),
            })
            .collect();
        diesel::insert_into(ip_range_rules::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    if !rules.client_acl_rules.is_empty() {
        let cidrs: Vec<String> = rules
            .client_acl_rules
            .iter()
            .map(|rule| acl_network_to_string(rule.network))
            .collect();
        let rows: Vec<NewClientAclRuleRow<'_>> = rules
            .client_acl_rules
            .iter()
            .zip(cidrs.iter())
            .map(|(rule, cidr)| NewClientAclRuleRow {
                id: rule.id.as_uuid(),
                config_id,
                priority: rule.priority,
                cidr,
                action: acl_action_to_str(rule.action),
            })
            .collect();
        diesel::insert_into(client_acl_rules::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    if !rules.parent_proxies.is_empty() {
        let hosts: Vec<String> = rules
            .parent_proxies
            .iter()
            .map(|entry| entry.address.to_string())
            .collect();
        let rows: Vec<NewParentProxyEntryRow<'_>> = rules
            .parent_proxies
            .iter()
            .zip(hosts.iter())
            .map(|(entry, host)| NewParentProxyEntryRow {
                id: entry.id.as_uuid(),
                config_id,
                host,
                port: i32::from(entry.port),
                priority: entry.priority,
                enabled: entry.enabled,
            })
            .collect();
        diesel::insert_into(parent_proxy_entries::table)
            .values(&rows)
            .execute(conn)
            .await?;
    }

    Ok(())
}

#[async_trait]
impl ConfigCommand for DieselConfigRepository {
    async fn create_draft(
        &self,
        new_config: NewConfiguration,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let id = Uuid::new_v4();
        let row = NewConfigurationRow {
            id,
            name: &new_config.name,
            description: &new_config.description,
            version: 1,
            default_action: default_action_to_str(new_config.default_action),
            status: STATUS_DRAFT,
            created_by: created_by.as_uuid(),
            created_at: now,
            modified_by: created_by.as_uuid(),
            modified_at: now,
        };

        diesel::insert_into(configurations::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(Configuration {
            id: ConfigId::from_uuid(id),
            name: new_config.name,
            description: new_config.description,
            version: 1,
            default_action: new_config.default_action,
            status: ConfigStatus::Draft,
            fingerprint: None,
            created_by,
            created_at: now,
            modified_by: created_by,
            modified_at: now,
            submitted_by: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
        })
    }

    async fn replace_rules(
        &self,
        id: ConfigId,
        rules: RuleSet,
        modified_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();

        let row: ConfigurationRow = conn
            .transaction(|conn| {
                async move {
                    replace_rule_rows(conn, config_id, &rules).await?;

                    diesel::update(configurations::table)
                        .filter(configurations::id.eq(config_id))
                        .set((
                            configurations::version.eq(configurations::version + 1),
                            configurations::modified_by.eq(modified_by.as_uuid()),
                            configurations::modified_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(row_to_configuration(row))
    }

    async fn submit(
        &self,
        id: ConfigId,
        submitted_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();

        let row: ConfigurationRow = conn
            .transaction(|conn| {
                async move {
                    let current: ConfigurationRow = configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(TxError::NotFound(id))?;
                    if current.status != STATUS_DRAFT {
                        return Err(TxError::StatusMismatch {
                            expected: STATUS_DRAFT.to_owned(),
                            actual: current.status,
                        });
                    }

                    diesel::update(configurations::table)
                        .filter(configurations::id.eq(config_id))
                        .set(&ConfigurationStatusUpdate {
                            status: STATUS_PENDING_APPROVAL,
                            displaced_at: None,
                            fingerprint: None,
                            submitted_by: Some(submitted_by.as_uuid()),
                            submitted_at: Some(now),
                            approved_by: None,
                            approved_at: None,
                        })
                        .execute(conn)
                        .await?;

                    configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .map_err(TxError::from)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        Ok(row_to_configuration(row))
    }

    async fn reject(
        &self,
        id: ConfigId,
        _rejected_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();

        let row: ConfigurationRow = conn
            .transaction(|conn| {
                async move {
                    let current: ConfigurationRow = configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(TxError::NotFound(id))?;
                    if current.status != STATUS_PENDING_APPROVAL {
                        return Err(TxError::StatusMismatch {
                            expected: STATUS_PENDING_APPROVAL.to_owned(),
                            actual: current.status,
                        });
                    }

                    diesel::update(configurations::table)
                        .filter(configurations::id.eq(config_id))
                        .set((
                            configurations::status.eq(STATUS_DRAFT),
                            configurations::submitted_by.eq(None::<Uuid>),
                            configurations::submitted_at.eq(None::<DateTime<Utc>>),
                            configurations::modified_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .map_err(TxError::from)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        Ok(row_to_configuration(row))
    }

    async fn approve(
        &self,
        id: ConfigId,
        approved_by: UserId,
        fingerprint: String,
        proxy_ids: Vec<ProxyId>,
        now: DateTime<Utc>,
    ) -> Result<(Configuration, ApproveOutcome), ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();
        let raw_proxy_ids: Vec<Uuid> = proxy_ids.iter().map(ProxyId::as_uuid).collect();

        let (row, displaced): (ConfigurationRow, Vec<Uuid>) = conn
            .transaction(|conn| {
                async move {
                    let current: ConfigurationRow = configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(TxError::NotFound(id))?;
                    if current.status != STATUS_PENDING_APPROVAL {
                        return Err(TxError::StatusMismatch {
                            expected: STATUS_PENDING_APPROVAL.to_owned(),
                            actual: current.status,
                        });
                    }

                    let previously_assigned: Vec<Uuid> = proxies::table
                        .filter(proxies::id.eq_any(raw_proxy_ids.clone()))
                        .select(proxies::assigned_config)
                        .load::<Option<Uuid>>(conn)
                        .await?
                        .into_iter()
                        .flatten()
                        .filter(|assigned| *assigned != config_id)
                        .collect();

                    let mut displaced = Vec::new();
                    if !previously_assigned.is_empty() {
                        let active_previous: Vec<Uuid> = configurations::table
                            .filter(configurations::id.eq_any(previously_assigned.clone()))
                            .filter(configurations::status.eq(STATUS_ACTIVE))
                            .select(configurations::id)
                            .load(conn)
                            .await?;

                        if !active_previous.is_empty() {
                            diesel::update(configurations::table)
                                .filter(configurations::id.eq_any(active_previous.clone()))
                                .set((
                                    configurations::status.eq(STATUS_DISPLACED),
                                    configurations::displaced_at.eq(Some(now)),
                                ))
                                .execute(conn)
                                .await?;
                            displaced = active_previous;
                        }
                    }

                    diesel::update(configurations::table)
                        .filter(configurations::id.eq(config_id))
                        .set(&ConfigurationStatusUpdate {
                            status: STATUS_ACTIVE,
                            displaced_at: None,
                            fingerprint: Some(&fingerprint),
                            submitted_by: current.submitted_by,
                            submitted_at: current.submitted_at,
                            approved_by: Some(approved_by.as_uuid()),
                            approved_at: Some(now),
                        })
                        .execute(conn)
                        .await?;

                    diesel::update(proxies::table)
                        .filter(proxies::id.eq_any(raw_proxy_ids.clone()))
                        .set(proxies::assigned_config.eq(Some(config_id)))
                        .execute(conn)
                        .await?;

                    let updated: ConfigurationRow = configurations::table
                        .filter(configurations::id.eq(config_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await?;

                    Ok((updated, displaced))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        Ok((
            row_to_configuration(row),
            ApproveOutcome {
                displaced: displaced.into_iter().map(ConfigId::from_uuid).collect(),
            },
        ))
    }

    async fn clone_config(
        &self,
        source_id: ConfigId,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Configuration, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let source_uuid = source_id.as_uuid();
        let new_id = Uuid::new_v4();

        let row: ConfigurationRow = conn
            .transaction(|conn| {
                async move {
                    let source: ConfigurationRow = configurations::table
                        .filter(configurations::id.eq(source_uuid))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(TxError::NotFound(source_id))?;
                    let mut rules = assemble_rule_set(conn, source_uuid).await?;
                    for rule in &mut rules.domain_rules {
                        rule.id = DomainRuleId::new();
                    }
                    for rule in &mut rules.ip_range_rules {
                        rule.id = IpRangeRuleId::new();
                    }
                    for rule in &mut rules.client_acl_rules {
                        rule.id = ClientAclRuleId::new();
                    }
                    for entry in &mut rules.parent_proxies {
                        entry.id = ParentProxyId::new();
                    }

                    let new_row = NewConfigurationRow {
                        id: new_id,
                        name: &format!("{} (copy)", source.name),
                        description: &source.description,
                        version: 1,
                        default_action: &source.default_action,
                        status: STATUS_DRAFT,
                        created_by: created_by.as_uuid(),
                        created_at: now,
                        modified_by: created_by.as_uuid(),
                        modified_at: now,
                    };
                    diesel::insert_into(configurations::table)
                        .values(&new_row)
                        .execute(conn)
                        .await?;

                    replace_rule_rows(conn, new_id, &rules).await?;

                    configurations::table
                        .filter(configurations::id.eq(new_id))
                        .select(ConfigurationRow::as_select())
                        .first(conn)
                        .await
                        .map_err(TxError::from)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        Ok(row_to_configuration(row))
    }

    async fn delete(&self, id: ConfigId) -> Result<(), ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();

        conn.transaction(|conn| {
            async move {
                diesel::delete(domain_rules::table.filter(domain_rules::config_id.eq(config_id)))
                    .execute(conn)
                    .await?;
                diesel::delete(ip_range_rules::table.filter(ip_range_rules::config_id.eq(config_id)))
                    .execute(conn)
                    .await?;
                diesel::delete(client_acl_rules::table.filter(client_acl_rules::config_id.eq(config_id)))
                    .execute(conn)
                    .await?;
                diesel::delete(
                    parent_proxy_entries::table.filter(parent_proxy_entries::config_id.eq(config_id)),
                )
                .execute(conn)
                .await?;
                diesel::delete(configurations::table.filter(configurations::id.eq(config_id)))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)?;

        Ok(())
    }
}

#[async_trait]
impl ConfigQuery for DieselConfigRepository {
    async fn get(
        &self,
        id: ConfigId,
    ) -> Result<Option<ConfigurationWithRules>, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let config_id = id.as_uuid();

        let row: Option<ConfigurationRow> = configurations::table
            .filter(configurations::id.eq(config_id))
            .select(ConfigurationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let rules = assemble_rule_set(&mut conn, config_id)
            .await
            .map_err(map_diesel_error)?;

        Ok(Some(ConfigurationWithRules {
            configuration: row_to_configuration(row),
            rules,
        }))
    }

    async fn list(
        &self,
        filter: ConfigListFilter,
    ) -> Result<Vec<Configuration>, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = configurations::table
            .select(ConfigurationRow::as_select())
            .order_by((configurations::created_at.asc(), configurations::id.asc()))
            .into_boxed();

        if let Some(status) = &filter.status {
            query = query.filter(configurations::status.eq(status.clone()));
        }
        if let Some(cursor) = &filter.cursor {
            if let Ok(decoded) = pagination::Cursor::decode(cursor) {
                if let Some(after) = DateTime::from_timestamp_millis(decoded.sort_key_millis) {
                    query = query.filter(configurations::created_at.gt(after));
                }
            }
        }
        if filter.limit > 0 {
            query = query.limit(i64::from(filter.limit));
        }

        let rows: Vec<ConfigurationRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_configuration).collect())
    }

    async fn active_for_proxy(
        &self,
        proxy_id: ProxyId,
    ) -> Result<Option<ConfigurationWithRules>, ConfigPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let assigned: Option<Uuid> = proxies::table
            .filter(proxies::id.eq(proxy_id.as_uuid()))
            .select(proxies::assigned_config)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .flatten();

        let Some(config_id) = assigned else {
            return Ok(None);
        };

        let row: Option<ConfigurationRow> = configurations::table
            .filter(configurations::id.eq(config_id))
            .select(ConfigurationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let rules = assemble_rule_set(&mut conn, config_id)
            .await
            .map_err(map_diesel_error)?;

        Ok(Some(ConfigurationWithRules {
            configuration: row_to_configuration(row),
            rules,
        }))
    }
}
