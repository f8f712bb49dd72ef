//! Fleet registry service: registration, polling, acknowledgement and
//! telemetry ingestion for sidecars.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use std::net::IpAddr;

use crate::domain::compiler::compile;
use crate::domain::fleet::identity::{resolve_register_decision, RegisterDecision};
use crate::domain::fleet::proxy::{LogLine, Proxy, ProxySample};
use crate::domain::fleet::sync::{PollConfigPayload, PollResponse};
use crate::domain::ids::ProxyId;
use crate::domain::ports::{
    ConfigPersistenceError, ConfigQuery, FleetPersistenceError, ProxyCommand,
    ProxyLogPersistenceError, ProxyLogRepository, ProxyQuery, ProxyStatsPersistenceError,
    ProxyStatsRepository, RegisterOutcome,
};
use crate::domain::Error;

/// Fleet registry service implementing the sync protocol's server side.
#[derive(Clone)]
pub struct FleetRegistryService<PC, PQ, CQ, ST, LG> {
    proxy_command: Arc<PC>,
    proxy_query: Arc<PQ>,
    config_query: Arc<CQ>,
    stats_repo: Arc<ST>,
    log_repo: Arc<LG>,
}

impl<PC, PQ, CQ, ST, LG> FleetRegistryService<PC, PQ, CQ, ST, LG> {
    /// Build a new registry service from its ports.
    pub fn new(
        proxy_command: Arc<PC>,
        proxy_query: Arc<PQ>,
        config_query: Arc<CQ>,
        stats_repo: Arc<ST>,
        log_repo: Arc<LG>,
    ) -> Self {
        Self {
            proxy_command,
            proxy_query,
            config_query,
            stats_repo,
            log_repo,
        }
    }
}

impl<PC, PQ, CQ, ST, LG> FleetRegistryService<PC, PQ, CQ, ST, LG>
where
    PC: ProxyCommand,
    PQ: ProxyQuery,
    CQ: ConfigQuery,
    ST: ProxyStatsRepository,
    LG: ProxyLogRepository,
{
    fn map_fleet_error(error: FleetPersistenceError) -> Error {
        match error {
            FleetPersistenceError::Connection { message } => {
                Error::internal(format!("fleet repository unavailable: {message}"))
            }
            FleetPersistenceError::Query { message } => {
                Error::internal(format!("fleet repository error: {message}"))
            }
            FleetPersistenceError::NotFound { id } => Error::not_found(format!("proxy {id}")),
        }
    }

    fn map_config_error(error: ConfigPersistenceError) -> Error {
        match error {
            ConfigPersistenceError::Connection { message } | ConfigPersistenceError::Query { message } => {
                Error::internal(format!("config repository error: {message}"))
            }
            ConfigPersistenceError::StatusMismatch { expected, actual } => Error::invalid_status(
                format!("expected configuration status {expected}, found {actual}"),
            ),
            ConfigPersistenceError::NotFound { id } => Error::not_found(format!("configuration {id}")),
        }
    }

    fn map_stats_error(error: ProxyStatsPersistenceError) -> Error {
        match error {
            ProxyStatsPersistenceError::Connection { message }
            | ProxyStatsPersistenceError::Query { message } => {
                Error::internal(format!("proxy stats repository error: {message}"))
            }
        }
    }

    fn map_log_error(error: ProxyLogPersistenceError) -> Error {
        match error {
            ProxyLogPersistenceError::Connection { message }
            | ProxyLogPersistenceError::Query { message } => {
                Error::internal(format!("proxy log repository error: {message}"))
            }
        }
    }

    /// Register (or re-register) a proxy by hostname.
    ///
    /// A second registration for a known hostname is rejected with
    /// [`Error::conflict`] unless the prior record is offline, or the
    /// caller presents the same `proxy_id` or `registered_ip` as the
    /// current record; see [`resolve_register_decision`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::conflict`] if a different proxy holds the hostname
    /// and is online; otherwise propagates repository failures as
    /// [`Error::internal`].
    pub async fn register(
        &self,
        hostname: String,
        registered_ip: IpAddr,
        proxy_id: Option<ProxyId>,
        now: DateTime<Utc>,
    ) -> Result<Proxy, Error> {
        let existing = self
            .proxy_query
            .find_by_hostname(&hostname)
            .await
            .map_err(Self::map_fleet_error)?;
        let decision = resolve_register_decision(existing.as_ref(), proxy_id, registered_ip);
        if decision == RegisterDecision::Conflict {
            return Err(Error::conflict(format!(
                "hostname {hostname} is already registered to an online proxy with a different identity"
            )));
        }
        let (proxy, _outcome): (Proxy, RegisterOutcome) = self
            .proxy_command
            .register(hostname, registered_ip, now)
            .await
            .map_err(Self::map_fleet_error)?;
        Ok(proxy)
    }

    /// Handle a poll: refresh liveness, and if a configuration is assigned,
    /// compile it (lazily, on every poll, so a drifted sidecar self-heals).
    ///
    /// # Errors
    ///
    /// Returns [`Error::not_found`] if `proxy_id` is unknown, otherwise
    /// propagates repository failures as [`Error::internal`].
    pub async fn poll(
        &self,
        proxy_id: ProxyId,
        observed_fingerprint: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PollResponse, Error> {
        let proxy = self
            .proxy_command
            .record_poll(proxy_id, observed_fingerprint.clone(), now)
            .await
            .map_err(Self::map_fleet_error)?;

        let assigned = self
            .config_query
            .active_for_proxy(proxy_id)
            .await
            .map_err(Self::map_config_error)?;

        let capture_until = proxy
            .log_capture_deadline
            .filter(|deadline| *deadline > now);
        let capture_logs = capture_until.is_some();

        let Some(assigned) = assigned else {
            return Ok(PollResponse {
                unchanged: true,
                hash: None,
                config: None,
                capture_logs,
                capture_until,
            });
        };

        let artefacts = compile(&assigned.configuration, &assigned.rules);
        let unchanged = observed_fingerprint.as_deref() == Some(artefacts.fingerprint.as_str());
        if unchanged {
            return Ok(PollResponse {
                unchanged: true,
                hash: Some(artefacts.fingerprint),
                config: None,
                capture_logs,
                capture_until,
            });
        }

        Ok(PollResponse {
            unchanged: false,
            hash: Some(artefacts.fingerprint.clone()),
            config: Some(PollConfigPayload {
                parent_config: artefacts.parent_config,
                sni_yaml: artefacts.sni_yaml,
                ip_allow_yaml: artefacts.ip_allow_yaml,
            }),
            capture_logs,
            capture_until,
        })
    }

    /// Record that a sidecar applied `fingerprint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::not_found`] if `proxy_id` is unknown.
    pub async fn ack(
        &self,
        proxy_id: ProxyId,
        fingerprint: String,
        now: DateTime<Utc>,
    ) -> Result<Proxy, Error> {
        self.proxy_command
            .record_ack(proxy_id, fingerprint, now)
            .await
            .map_err(Self::map_fleet_error)
    }

    /// Extend a proxy's log-capture deadline. If a capture is already in
    /// progress, the deadline is extended to whichever of the existing and
    /// requested deadlines is later, so two operators requesting overlapping
    /// captures never truncate each other's window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::not_found`] if `proxy_id` is unknown.
    pub async fn request_log_capture(
        &self,
        proxy_id: ProxyId,
        requested_until: DateTime<Utc>,
    ) -> Result<Proxy, Error> {
        let proxy = self
            .proxy_query
            .find_by_id(proxy_id)
            .await
            .map_err(Self::map_fleet_error)?
            .ok_or_else(|| Error::not_found(format!("proxy {proxy_id}")))?;

        let extended_until = match proxy.log_capture_deadline {
            Some(existing) if existing > requested_until => existing,
            _ => requested_until,
        };

        self.proxy_command
            .extend_capture_deadline(proxy_id, extended_until)
            .await
            .map_err(Self::map_fleet_error)
    }

    /// Store a metrics sample pushed by a sidecar.
    ///
    /// # Errors
    ///
    /// Propagates repository failures as [`Error::internal`].
    pub async fn push_stats(&self, sample: ProxySample) -> Result<(), Error> {
        self.stats_repo
            .insert_sample(sample)
            .await
            .map_err(Self::map_stats_error)
    }

    /// Store a batch of captured log lines pushed by a sidecar.
    ///
    /// # Errors
    ///
    /// Propagates repository failures as [`Error::internal`].
    pub async fn push_logs(&self, proxy_id: ProxyId, lines: Vec<LogLine>) -> Result<(), Error> {
        self.log_repo
            .append(proxy_id, lines)
            .await
            .map_err(Self::map_log_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{Configuration, ConfigStatus, ConfigurationWithRules, DefaultAction, RuleSet};
    use crate::domain::ids::{ConfigId, UserId};
    use crate::domain::ports::{
        MockConfigQuery, MockProxyCommand, MockProxyLogRepository, MockProxyQuery,
        MockProxyStatsRepository,
    };
    use chrono::Utc;

    fn sample_proxy(id: ProxyId, deadline: Option<DateTime<Utc>>) -> Proxy {
        Proxy {
            id,
            hostname: "edge-1".into(),
            assigned_config: None,
            is_online: true,
            last_seen: Utc::now(),
            registered_ip: "10.0.0.1".parse().unwrap(),
            observed_fingerprint: None,
            log_capture_deadline: deadline,
        }
    }

    fn sample_config_with_rules() -> ConfigurationWithRules {
        let now = Utc::now();
        let user = UserId::new();
        ConfigurationWithRules {
            configuration: Configuration {
                id: ConfigId::new(),
                name: "edge".into(),
                description: String::new(),
                version: 1,
                default_action: DefaultAction::Direct,
                status: ConfigStatus::Active,
                fingerprint: Some("abc".into()),
                created_by: user,
                created_at: now,
                modified_by: user,
                modified_at: now,
                submitted_by: None,
                submitted_at: None,
                approved_by: Some(user),
                approved_at: Some(now),
            },
            rules: RuleSet::default(),
        }
    }

    #[tokio::test]
    async fn poll_returns_empty_artifacts_when_unassigned() {
        let proxy_id = ProxyId::new();
        let mut proxy_command = MockProxyCommand::new();
        proxy_command
            .expect_record_poll()
            .returning(move |_, _, _| Ok(sample_proxy(proxy_id, None)));
        let proxy_query = MockProxyQuery::new();
        let mut config_query = MockConfigQuery::new();
        config_query
            .expect_active_for_proxy()
            .returning(|_| Ok(None));
        let stats_repo = MockProxyStatsRepository::new();
        let log_repo = MockProxyLogRepository::new();

        let service = FleetRegistryService::new(
            Arc::new(proxy_command),
            Arc::new(proxy_query),
            Arc::new(config_query),
            Arc::new(stats_repo),
            Arc::new(log_repo),
        );

        let response = service.poll(proxy_id, None, Utc::now()).await.expect("poll ok");
        assert!(response.unchanged);
        assert!(response.hash.is_none());
        assert!(response.config.is_none());
    }

    #[tokio::test]
    async fn poll_compiles_assigned_configuration() {
        let proxy_id = ProxyId::new();
        let mut proxy_command = MockProxyCommand::new();
        proxy_command
            .expect_record_poll()
            .returning(move |_, _, _| Ok(sample_proxy(proxy_id, None)));
        let proxy_query = MockProxyQuery::new();
        let mut config_query = MockConfigQuery::new();
        config_query
            .expect_active_for_proxy()
            .returning(|_| Ok(Some(sample_config_with_rules())));
        let stats_repo = MockProxyStatsRepository::new();
        let log_repo = MockProxyLogRepository::new();

        let service = FleetRegistryService::new(
            Arc::new(proxy_command),
            Arc::new(proxy_query),
            Arc::new(config_query),
            Arc::new(stats_repo),
            Arc::new(log_repo),
        );

        let response = service.poll(proxy_id, None, Utc::now()).await.expect("poll ok");
        assert!(!response.unchanged);
        assert!(response.hash.is_some());
        assert!(response.config.is_some());
    }

    #[tokio::test]
    async fn poll_reports_unchanged_when_fingerprint_matches() {
        let proxy_id = ProxyId::new();
        let mut proxy_command = MockProxyCommand::new();
        proxy_command
            .expect_record_poll()
            .returning(move |_, _, _| Ok(sample_proxy(proxy_id, None)));
        let proxy_query = MockProxyQuery::new();
        let mut config_query = MockConfigQuery::new();
        config_query
            .expect_active_for_proxy()
            .returning(|_| Ok(Some(sample_config_with_rules())));
        let stats_repo = MockProxyStatsRepository::new();
        let log_repo = MockProxyLogRepository::new();

        let service = FleetRegistryService::new(
            Arc::new(proxy_command),
            Arc::new(proxy_query),
            Arc::new(config_query),
            Arc::new(stats_repo),
            Arc::new(log_repo),
        );

        let first = service.poll(proxy_id, None, Utc::now()).await.expect("poll ok");
        let second = service
            .poll(proxy_id, first.hash.clone(), Utc::now())
            .await
            .expect("poll ok");
        assert!(second.unchanged);
        assert!(second.config.is_none());
        assert_eq!(second.hash, first.hash);
    }

    #[tokio::test]
    async fn register_rejects_conflicting_identity_for_online_proxy() {
        let existing_id = ProxyId::new();
        let mut proxy_query = MockProxyQuery::new();
        proxy_query.expect_find_by_hostname().returning(move |_| {
            Ok(Some(Proxy {
                id: existing_id,
                hostname: "edge-1".into(),
                assigned_config: None,
                is_online: true,
                last_seen: Utc::now(),
                registered_ip: "10.0.0.1".parse().unwrap(),
                observed_fingerprint: None,
                log_capture_deadline: None,
            }))
        });
        let proxy_command = MockProxyCommand::new();
        let config_query = MockConfigQuery::new();
        let stats_repo = MockProxyStatsRepository::new();
        let log_repo = MockProxyLogRepository::new();

        let service = FleetRegistryService::new(
            Arc::new(proxy_command),
            Arc::new(proxy_query),
            Arc::new(config_query),
            Arc::new(stats_repo),
            Arc::new(log_repo),
        );

        let error = service
            .register(
                "edge-1".into(),
                "10.0.0.9".parse().unwrap(),
                Some(ProxyId::new()),
                Utc::now(),
            )
            .await
            .expect_err("expected conflict");
        assert_eq!(error.code(), crate::domain::error::ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn request_log_capture_extends_to_later_deadline() {
        let proxy_id = ProxyId::new();
        let now = Utc::now();
        let existing_deadline = now + chrono::Duration::minutes(10);
        let requested_deadline = now + chrono::Duration::minutes(5);

        let mut proxy_query = MockProxyQuery::new();
        proxy_query
            .expect_find_by_id()
            .returning(move |_| Ok(Some(sample_proxy(proxy_id, Some(existing_deadline)))));

        let mut proxy_command = MockProxyCommand::new();
        proxy_command
            .expect_extend_capture_deadline()
            .withf(move |_, until| *until == existing_deadline)
            .returning(move |_, until| Ok(sample_proxy(proxy_id, Some(until))));

        let config_query = MockConfigQuery::new();
        let stats_repo = MockProxyStatsRepository::new();
        let log_repo = MockProxyLogRepository::new();

        let service = FleetRegistryService::new(
            Arc::new(proxy_command),
            Arc::new(proxy_query),
            Arc::new(config_query),
            Arc::new(stats_repo),
            Arc::new(log_repo),
        );

        let proxy = service
            .request_log_capture(proxy_id, requested_deadline)
            .await
            .expect("extend ok");
        assert_eq!(proxy.log_capture_deadline, Some(existing_deadline));
    }
}
