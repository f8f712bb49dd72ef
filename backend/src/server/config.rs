//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use backend::outbound::persistence::DbPool;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

/// Builder-style configuration for creating the HTTP server.
///
/// Unlike the session-cookie predecessor, this server authenticates every
/// request against the database, so a connection pool is mandatory rather
/// than an optional fixture fallback.
pub struct ServerConfig {
    pub(crate) db_pool: DbPool,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) session_token_pepper: std::sync::Arc<str>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    /// Construct a server configuration from a database pool, bind address,
    /// and the `SESSION_TOKEN_PEPPER` mixed into bearer-token hashing.
    #[must_use]
    pub fn new(
        db_pool: DbPool,
        bind_addr: SocketAddr,
        session_token_pepper: std::sync::Arc<str>,
    ) -> Self {
        Self {
            db_pool,
            bind_addr,
            session_token_pepper,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Return the socket address the server will bind to.
    #[cfg_attr(
        not(any(test, doctest)),
        expect(
            dead_code,
            reason = "Exercised by integration tests; retained for fixture access"
        )
    )]
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }

    #[cfg(feature = "metrics")]
    /// Return the configured Prometheus middleware, if any.
    #[cfg_attr(
        not(any(test, doctest)),
        expect(
            dead_code,
            reason = "Exercised by integration tests behind feature flags"
        )
    )]
    #[must_use]
    pub fn metrics(&self) -> Option<&PrometheusMetrics> {
        self.prometheus.as_ref()
    }
}
