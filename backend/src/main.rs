#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), forbid(clippy::expect_used))]
//! Backend entry-point: wires the REST API and OpenAPI docs for the fleet
//! control plane.

mod server;

use std::env;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
use ortho_config::OrthoConfig;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::config::BackendSettings;
use backend::outbound::persistence::{DbPool, PoolConfig};
use server::ServerConfig;

#[cfg(feature = "metrics")]
fn make_metrics() -> Result<actix_web_prom::PrometheusMetrics, Box<dyn std::error::Error + Send + Sync>>
{
    PrometheusMetricsBuilder::new("atsctl")
        .endpoint("/metrics")
        .build()
}

#[cfg(feature = "metrics")]
fn initialize_metrics<F, E>(make: F) -> Option<actix_web_prom::PrometheusMetrics>
where
    F: FnOnce() -> Result<actix_web_prom::PrometheusMetrics, E>,
    E: std::fmt::Display,
{
    match make() {
        Ok(metrics) => Some(metrics),
        Err(error) => {
            warn!(
                error = %error,
                "failed to initialize Prometheus metrics; continuing without metrics"
            );
            None
        }
    }
}

fn load_settings() -> std::io::Result<BackendSettings> {
    BackendSettings::load_from_iter(env::args_os()).map_err(|err| {
        std::io::Error::other(format!("failed to load backend configuration: {err}"))
    })
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = load_settings()?;

    let pool = DbPool::new(PoolConfig::new(settings.database_url.clone()))
        .await
        .map_err(|err| std::io::Error::other(format!("failed to build database pool: {err}")))?;

    server::janitor::spawn(&pool, settings.stale_proxy_window());

    let addr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .map_err(|err| std::io::Error::other(format!("invalid bind address: {err}")))?;

    let pepper: Arc<str> = Arc::from(settings.session_token_pepper.as_str());
    let mut config = ServerConfig::new(pool, addr, pepper);
    #[cfg(feature = "metrics")]
    {
        config = config.with_metrics(initialize_metrics(make_metrics));
    }

    server::create_server(config)?.await
}
