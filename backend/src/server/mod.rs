//! Server construction and middleware wiring.

mod config;
pub(crate) mod janitor;
#[cfg(feature = "metrics")]
mod metrics;

pub use config::ServerConfig;

#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use mockable::DefaultClock;

use backend::Trace;
#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::domain::authentication::AuthenticationService;
use backend::domain::fleet::FleetRegistryService;
use backend::domain::lifecycle::ConfigLifecycleService;
use backend::inbound::http::routes;
use backend::inbound::http::state::{HttpState, HttpStatePorts};
use backend::outbound::persistence::{
    DbPool, DieselAuditRepository, DieselConfigRepository, DieselFleetRepository,
    DieselProxyLogRepository, DieselProxyStatsRepository, DieselSessionRepository,
    DieselUserRepository,
};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Build the shared HTTP state from a database pool.
fn build_http_state(pool: &DbPool, session_token_pepper: Arc<str>) -> web::Data<HttpState> {
    let users = Arc::new(DieselUserRepository::new(pool.clone()));
    let sessions = Arc::new(DieselSessionRepository::new(pool.clone()));
    let configs = Arc::new(DieselConfigRepository::new(pool.clone()));
    let fleet = Arc::new(DieselFleetRepository::new(pool.clone()));
    let proxy_logs = Arc::new(DieselProxyLogRepository::new(pool.clone()));
    let proxy_stats = Arc::new(DieselProxyStatsRepository::new(pool.clone()));
    let audit = Arc::new(DieselAuditRepository::new(pool.clone()));

    let authentication = Arc::new(AuthenticationService::new(
        users.clone(),
        sessions.clone(),
        Arc::new(DefaultClock),
        session_token_pepper,
    ));
    let lifecycle = Arc::new(ConfigLifecycleService::new(
        configs.clone(),
        configs.clone(),
        audit.clone(),
    ));
    let registry = Arc::new(FleetRegistryService::new(
        fleet.clone(),
        fleet.clone(),
        configs.clone(),
        proxy_stats.clone(),
        proxy_logs.clone(),
    ));

    web::Data::new(HttpState::new(HttpStatePorts {
        authentication,
        lifecycle,
        registry,
        config_query: configs,
        proxy_query: fleet.clone(),
        proxy_command: fleet,
        proxy_logs,
        proxy_stats,
        audit,
    }))
}

fn build_app(
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(http_state)
        .wrap(Trace)
        .configure(routes::configure);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server from the provided configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: ServerConfig) -> std::io::Result<Server> {
    let ServerConfig {
        db_pool,
        bind_addr,
        session_token_pepper,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;

    let http_state = build_http_state(&db_pool, session_token_pepper);

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(http_state.clone());

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}
