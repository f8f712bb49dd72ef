//! Top-level HTTP route wiring.
//!
//! Everything under `/api/v1` requires a bearer token (enforced per-handler
//! by the [`crate::inbound::http::auth::AuthenticatedUser`] extractor);
//! `/sync/*` and `/health` are deliberately outside that scope, per the
//! sync protocol's own no-auth contract.

use std::env;

use actix_web::web;

use crate::SyncSecret;
use crate::inbound::http::{audit, configs, health, login, proxies, sync};

/// Register every HTTP service against an `actix_web` app or scope.
///
/// The sync sub-scope carries an optional shared-secret check
/// (`SYNC_SHARED_SECRET`); see [`crate::middleware::sync_secret`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Empty prefix: each handler's own route attribute already starts with
    // `/sync`, this scope only exists to scope the shared-secret wrapper.
    let sync_scope = web::scope("")
        .wrap(SyncSecret::new(env::var("SYNC_SHARED_SECRET").ok()))
        .service(sync::register)
        .service(sync::poll)
        .service(sync::ack)
        .service(sync::stats)
        .service(sync::logs);

    cfg.service(
        web::scope("/api/v1")
            .service(health::health)
            .service(sync_scope)
            .service(login::login)
            .service(login::refresh)
            .service(login::beacon)
            .service(login::logout)
            .service(configs::list)
            .service(configs::create)
            .service(configs::get)
            .service(configs::update_rules)
            .service(configs::delete)
            .service(configs::submit)
            .service(configs::approve)
            .service(configs::reject)
            .service(configs::clone)
            .service(proxies::list)
            .service(proxies::get)
            .service(proxies::start_log_capture)
            .service(proxies::list_logs)
            .service(proxies::assign_config)
            .service(proxies::delete)
            .service(audit::list),
    );
}
