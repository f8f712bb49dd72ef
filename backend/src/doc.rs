//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. Domain types derive [`utoipa::ToSchema`]
//! directly, so no HTTP-layer schema wrappers are needed.
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::audit::AuditEntry;
use crate::domain::config::{
    ConfigStatus, Configuration, ConfigurationWithRules, NewConfiguration, RuleSet,
};
use crate::domain::fleet::{LogLine, PollResponse, Proxy, ProxySample};
use crate::domain::{Error, ErrorCode, Role, User};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Bearer token issued by POST /api/v1/auth/login."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the fleet control plane REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "ATS fleet control plane API",
        description = "HTTP interface for operator consoles and the sidecar sync protocol.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerAuth" = [])),
    paths(
        crate::inbound::http::health::health,
        crate::inbound::http::sync::register,
        crate::inbound::http::sync::poll,
        crate::inbound::http::sync::ack,
        crate::inbound::http::sync::stats,
        crate::inbound::http::sync::logs,
        crate::inbound::http::login::login,
        crate::inbound::http::login::refresh,
        crate::inbound::http::login::beacon,
        crate::inbound::http::login::logout,
        crate::inbound::http::configs::list,
        crate::inbound::http::configs::create,
        crate::inbound::http::configs::get,
        crate::inbound::http::configs::update_rules,
        crate::inbound::http::configs::delete,
        crate::inbound::http::configs::submit,
        crate::inbound::http::configs::approve,
        crate::inbound::http::configs::reject,
        crate::inbound::http::configs::clone,
        crate::inbound::http::proxies::list,
        crate::inbound::http::proxies::get,
        crate::inbound::http::proxies::start_log_capture,
        crate::inbound::http::proxies::list_logs,
        crate::inbound::http::proxies::assign_config,
        crate::inbound::http::proxies::delete,
        crate::inbound::http::audit::list,
    ),
    components(schemas(
        Error,
        ErrorCode,
        User,
        Role,
        Configuration,
        ConfigurationWithRules,
        NewConfiguration,
        RuleSet,
        ConfigStatus,
        Proxy,
        ProxySample,
        LogLine,
        PollResponse,
        AuditEntry,
    )),
    tags(
        (name = "auth", description = "Operator authentication"),
        (name = "configs", description = "Configuration authoring and lifecycle"),
        (name = "proxies", description = "Fleet registry and proxy operations"),
        (name = "sync", description = "Sidecar sync protocol"),
        (name = "audit", description = "Audit log"),
        (name = "health", description = "Endpoints for health checks"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying OpenAPI schema field structure.

    use super::*;
    use utoipa::OpenApi;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.error.Error";
    const USER_SCHEMA_NAME: &str = "crate.domain.user.User";

    #[test]
    fn openapi_document_registers_error_and_user_schemas() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;

        assert!(
            schemas.contains_key(ERROR_SCHEMA_NAME) || schemas.keys().any(|k| k.ends_with("Error")),
            "expected an Error schema to be registered, found: {:?}",
            schemas.keys().collect::<Vec<_>>()
        );
        assert!(
            schemas.contains_key(USER_SCHEMA_NAME) || schemas.keys().any(|k| k.ends_with("User")),
            "expected a User schema to be registered, found: {:?}",
            schemas.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn openapi_document_registers_bearer_security_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.as_ref().expect("components");
        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
