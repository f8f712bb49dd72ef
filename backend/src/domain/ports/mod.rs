//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Every port is a small `Command`/`Query` trait pair (or a single trait for
//! aggregates with no meaningful command/query split) implemented by an
//! outbound Diesel adapter in production and by `mockall`-generated mocks in
//! tests.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_repository;
mod config_repository;
mod fleet_repository;
mod proxy_log_repository;
mod proxy_stats_repository;
mod session_repository;
mod user_repository;

pub use audit_repository::{AuditListFilter, AuditLogRepository, AuditPersistenceError};
pub use config_repository::{
    ApproveOutcome, ConfigCommand, ConfigListFilter, ConfigPersistenceError, ConfigQuery,
};
pub use fleet_repository::{FleetPersistenceError, ProxyCommand, ProxyQuery, RegisterOutcome};
pub use proxy_log_repository::{ProxyLogPersistenceError, ProxyLogRepository};
pub use proxy_stats_repository::{ProxyStatsPersistenceError, ProxyStatsRepository};
pub use session_repository::{SessionPersistenceError, SessionRepository};
pub use user_repository::{NewUser, UserPersistenceError, UserRepository};

#[cfg(test)]
pub use audit_repository::MockAuditLogRepository;
#[cfg(test)]
pub use config_repository::{MockConfigCommand, MockConfigQuery};
#[cfg(test)]
pub use fleet_repository::{MockProxyCommand, MockProxyQuery};
#[cfg(test)]
pub use proxy_log_repository::MockProxyLogRepository;
#[cfg(test)]
pub use proxy_stats_repository::MockProxyStatsRepository;
#[cfg(test)]
pub use session_repository::MockSessionRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
