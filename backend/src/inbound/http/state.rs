//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::authentication::AuthenticationService;
use crate::domain::fleet::FleetRegistryService;
use crate::domain::lifecycle::ConfigLifecycleService;
use crate::domain::ports::{
    AuditLogRepository, ConfigQuery, ProxyCommand, ProxyLogRepository, ProxyQuery,
    ProxyStatsRepository,
};
use crate::outbound::persistence::{
    DieselAuditRepository, DieselConfigRepository, DieselFleetRepository,
    DieselProxyLogRepository, DieselProxyStatsRepository, DieselSessionRepository,
    DieselUserRepository,
};

/// Concrete authentication service used by every HTTP handler.
///
/// Parameterised over the Diesel adapters directly rather than trait
/// objects: the service struct's generic parameters are implicitly `Sized`,
/// and there is only one production backend to plug in.
pub type Authentication = AuthenticationService<DieselUserRepository, DieselSessionRepository>;

/// Concrete configuration lifecycle service used by every HTTP handler.
pub type ConfigLifecycle =
    ConfigLifecycleService<DieselConfigRepository, DieselConfigRepository, DieselAuditRepository>;

/// Concrete fleet registry service used by every HTTP handler.
pub type FleetRegistry = FleetRegistryService<
    DieselFleetRepository,
    DieselFleetRepository,
    DieselConfigRepository,
    DieselProxyStatsRepository,
    DieselProxyLogRepository,
>;

/// Parameter object bundling all services and ports for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub authentication: Arc<Authentication>,
    pub lifecycle: Arc<ConfigLifecycle>,
    pub registry: Arc<FleetRegistry>,
    pub config_query: Arc<dyn ConfigQuery>,
    pub proxy_query: Arc<dyn ProxyQuery>,
    pub proxy_command: Arc<dyn ProxyCommand>,
    pub proxy_logs: Arc<dyn ProxyLogRepository>,
    pub proxy_stats: Arc<dyn ProxyStatsRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub authentication: Arc<Authentication>,
    pub lifecycle: Arc<ConfigLifecycle>,
    pub registry: Arc<FleetRegistry>,
    pub config_query: Arc<dyn ConfigQuery>,
    pub proxy_query: Arc<dyn ProxyQuery>,
    pub proxy_command: Arc<dyn ProxyCommand>,
    pub proxy_logs: Arc<dyn ProxyLogRepository>,
    pub proxy_stats: Arc<dyn ProxyStatsRepository>,
    pub audit: Arc<dyn AuditLogRepository>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            authentication,
            lifecycle,
            registry,
            config_query,
            proxy_query,
            proxy_command,
            proxy_logs,
            proxy_stats,
            audit,
        } = ports;
        Self {
            authentication,
            lifecycle,
            registry,
            config_query,
            proxy_query,
            proxy_command,
            proxy_logs,
            proxy_stats,
            audit,
        }
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        ports.into()
    }
}
