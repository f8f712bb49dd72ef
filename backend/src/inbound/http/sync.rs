//! Unauthenticated sidecar sync protocol.
//!
//! ```text
//! POST /sync/register
//! GET  /sync?hostname=&hash=
//! POST /sync/ack
//! POST /sync/stats
//! POST /sync/logs
//! ```
//!
//! The protocol is keyed by hostname rather than the stable proxy id the
//! control plane uses internally, so every handler resolves a hostname to a
//! proxy before delegating to [`crate::domain::fleet::FleetRegistryService`].

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::fleet::{Proxy, ProxySample};
use crate::domain::ids::{ConfigId, ProxyId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

async fn find_proxy_by_hostname(state: &HttpState, hostname: &str) -> ApiResult<Proxy> {
    state
        .proxy_query
        .find_by_hostname(hostname)
        .await
        .map_err(|err| Error::internal(format!("fleet repository error: {err}")))?
        .ok_or_else(|| Error::not_found(format!("proxy with hostname {hostname}")))
}

/// Body of `POST /sync/register`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub hostname: String,
    #[serde(default)]
    pub proxy_id: Option<ProxyId>,
}

/// Response to `POST /sync/register`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub proxy_id: String,
    pub config_id: Option<ConfigId>,
}

#[utoipa::path(
    post,
    path = "/api/v1/sync/register",
    request_body = RegisterRequest,
    responses((status = 200, description = "Registered or re-registered", body = RegisterResponse)),
    tags = ["sync"],
    operation_id = "sync_register",
    security([])
)]
#[post("/sync/register")]
pub async fn register(
    state: web::Data<HttpState>,
    req: actix_web::HttpRequest,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registered_ip = req
        .peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    let payload = payload.into_inner();
    let proxy = state
        .registry
        .register(payload.hostname, registered_ip, payload.proxy_id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(RegisterResponse {
        proxy_id: proxy.id.to_string(),
        config_id: proxy.assigned_config,
    }))
}

/// Query parameters accepted by `GET /sync`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PollQuery {
    pub hostname: String,
    pub hash: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/sync",
    params(PollQuery),
    responses((status = 200, description = "Poll result")),
    tags = ["sync"],
    operation_id = "sync_poll",
    security([])
)]
#[get("/sync")]
pub async fn poll(
    state: web::Data<HttpState>,
    query: web::Query<PollQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let proxy = find_proxy_by_hostname(&state, &query.hostname).await?;
    tracing::debug!(
        hostname = %query.hostname,
        proxy_id = %proxy.id,
        hash = query.hash.as_deref().unwrap_or(""),
        "sidecar poll",
    );
    let response = state
        .registry
        .poll(proxy.id, query.hash, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Body of `POST /sync/ack`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AckRequest {
    pub hostname: String,
    pub hash: String,
    pub status: AckStatus,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

#[utoipa::path(
    post,
    path = "/api/v1/sync/ack",
    request_body = AckRequest,
    responses((status = 204, description = "Acknowledgement recorded")),
    tags = ["sync"],
    operation_id = "sync_ack",
    security([])
)]
#[post("/sync/ack")]
pub async fn ack(
    state: web::Data<HttpState>,
    payload: web::Json<AckRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let proxy = find_proxy_by_hostname(&state, &payload.hostname).await?;
    match payload.status {
        AckStatus::Ok => {
            tracing::debug!(
                hostname = %payload.hostname,
                proxy_id = %proxy.id,
                hash = %payload.hash,
                "sidecar acked config apply",
            );
            state
                .registry
                .ack(proxy.id, payload.hash, chrono::Utc::now())
                .await?;
        }
        AckStatus::Error => {
            // Per the sync protocol, a failed apply leaves the prior
            // fingerprint untouched; only the message is of interest, and it
            // goes to the application log, not to persistence.
            tracing::warn!(
                hostname = %payload.hostname,
                hash = %payload.hash,
                message = payload.message.as_deref().unwrap_or(""),
                "sidecar reported apply failure",
            );
        }
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Body of `POST /sync/stats`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub hostname: String,
    pub captured_at: chrono::DateTime<chrono::Utc>,
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

#[utoipa::path(
    post,
    path = "/api/v1/sync/stats",
    request_body = StatsRequest,
    responses((status = 204, description = "Sample recorded")),
    tags = ["sync"],
    operation_id = "sync_stats",
    security([])
)]
#[post("/sync/stats")]
pub async fn stats(
    state: web::Data<HttpState>,
    payload: web::Json<StatsRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let proxy = find_proxy_by_hostname(&state, &payload.hostname).await?;
    state
        .registry
        .push_stats(ProxySample {
            proxy_id: proxy.id,
            captured_at: payload.captured_at,
            active_connections: payload.active_connections,
            total_connections: payload.total_connections,
            cache_hits: payload.cache_hits,
            cache_misses: payload.cache_misses,
            errors: payload.errors,
            total_requests: payload.total_requests,
            connect_requests: payload.connect_requests,
            responses_2xx: payload.responses_2xx,
            responses_3xx: payload.responses_3xx,
            responses_4xx: payload.responses_4xx,
            responses_5xx: payload.responses_5xx,
            err_connect_fail: payload.err_connect_fail,
            err_client_abort: payload.err_client_abort,
            broken_server_conns: payload.broken_server_conns,
            bytes_in: payload.bytes_in,
            bytes_out: payload.bytes_out,
        })
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// A single captured line within a [`LogsRequest`].
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogLineRequest {
    pub captured_at: chrono::DateTime<chrono::Utc>,
    pub text: String,
}

/// Body of `POST /sync/logs`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogsRequest {
    pub hostname: String,
    pub lines: Vec<LogLineRequest>,
}

/// Response to `POST /sync/logs`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogsResponse {
    pub continue_capture: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/sync/logs",
    request_body = LogsRequest,
    responses((status = 200, description = "Lines stored", body = LogsResponse)),
    tags = ["sync"],
    operation_id = "sync_logs",
    security([])
)]
#[post("/sync/logs")]
pub async fn logs(
    state: web::Data<HttpState>,
    payload: web::Json<LogsRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let proxy = find_proxy_by_hostname(&state, &payload.hostname).await?;
    let now = chrono::Utc::now();
    let continue_capture = proxy
        .log_capture_deadline
        .is_some_and(|deadline| now < deadline);
    let lines = payload
        .lines
        .into_iter()
        .map(|line| crate::domain::fleet::LogLine {
            proxy_id: proxy.id,
            captured_at: line.captured_at,
            text: line.text,
        })
        .collect();
    state.registry.push_logs(proxy.id, lines).await?;
    Ok(HttpResponse::Ok().json(LogsResponse { continue_capture }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_status_deserializes_lowercase() {
        let ok: AckStatus = serde_json::from_str("\"ok\"").unwrap();
        assert_eq!(ok, AckStatus::Ok);
        let error: AckStatus = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(error, AckStatus::Error);
    }
}
