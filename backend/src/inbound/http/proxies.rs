//! Proxy fleet listing, stats history and log capture handlers.
//!
//! ```text
//! GET    /api/v1/proxies
//! GET    /api/v1/proxies/{id}
//! POST   /api/v1/proxies/{id}/logs
//! GET    /api/v1/proxies/{id}/logs
//! PUT    /api/v1/proxies/{id}/config
//! DELETE /api/v1/proxies/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::fleet::{Proxy, ProxySample};
use crate::domain::{Error, Role, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::parse_uuid;

const DEFAULT_LOG_LIMIT: u32 = 500;
const MIN_CAPTURE_MINUTES: i64 = 1;
const MAX_CAPTURE_MINUTES: i64 = 5;

fn require_admin(user: &User) -> ApiResult<()> {
    if user.role >= Role::Admin {
        Ok(())
    } else {
        Err(Error::forbidden("admin privileges required"))
    }
}

/// One hour of rolled-up counters for a proxy, summed from its raw samples.
///
/// `active_connections` is a gauge, so the summary carries the latest
/// sample's value rather than a sum across the window.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
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
    pub sample_count: usize,
}

impl StatsSummary {
    fn summarize(samples: &[ProxySample]) -> Self {
        let mut summary = Self {
            active_connections: 0,
            total_connections: 0,
            cache_hits: 0,
            cache_misses: 0,
            errors: 0,
            total_requests: 0,
            connect_requests: 0,
            responses_2xx: 0,
            responses_3xx: 0,
            responses_4xx: 0,
            responses_5xx: 0,
            err_connect_fail: 0,
            err_client_abort: 0,
            broken_server_conns: 0,
            bytes_in: 0,
            bytes_out: 0,
            sample_count: samples.len(),
        };
        for sample in samples {
            summary.active_connections = sample.active_connections;
            summary.total_connections += sample.total_connections;
            summary.cache_hits += sample.cache_hits;
            summary.cache_misses += sample.cache_misses;
            summary.errors += sample.errors;
            summary.total_requests += sample.total_requests;
            summary.connect_requests += sample.connect_requests;
            summary.responses_2xx += sample.responses_2xx;
            summary.responses_3xx += sample.responses_3xx;
            summary.responses_4xx += sample.responses_4xx;
            summary.responses_5xx += sample.responses_5xx;
            summary.err_connect_fail += sample.err_connect_fail;
            summary.err_client_abort += sample.err_client_abort;
            summary.broken_server_conns += sample.broken_server_conns;
            summary.bytes_in += sample.bytes_in;
            summary.bytes_out += sample.bytes_out;
        }
        summary
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyListEntry {
    #[serde(flatten)]
    pub proxy: Proxy,
    pub stats: StatsSummary,
}

#[utoipa::path(
    get,
    path = "/api/v1/proxies",
    responses((status = 200, description = "Fleet with 1-hour stats summaries")),
    tags = ["proxies"],
    operation_id = "list_proxies",
)]
#[get("/proxies")]
pub async fn list(state: web::Data<HttpState>, _user: AuthenticatedUser) -> ApiResult<HttpResponse> {
    let proxies = state
        .proxy_query
        .list()
        .await
        .map_err(|err| Error::internal(format!("fleet repository error: {err}")))?;
    let since = chrono::Utc::now() - chrono::Duration::hours(1);
    let mut entries = Vec::with_capacity(proxies.len());
    for proxy in proxies {
        let samples = state
            .proxy_stats
            .samples_since(proxy.id, since)
            .await
            .map_err(|err| Error::internal(format!("proxy stats repository error: {err}")))?;
        entries.push(ProxyListEntry {
            stats: StatsSummary::summarize(&samples),
            proxy,
        });
    }
    Ok(HttpResponse::Ok().json(entries))
}

/// A single minute's aggregated counters, for `GET /proxies/{id}` history.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinuteBucket {
    pub minute: chrono::DateTime<chrono::Utc>,
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

fn bucket_by_minute(samples: &[ProxySample]) -> Vec<MinuteBucket> {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<chrono::DateTime<chrono::Utc>, MinuteBucket> = BTreeMap::new();
    for sample in samples {
        let minute = sample
            .captured_at
            .date_naive()
            .and_hms_opt(sample.captured_at.time().hour(), sample.captured_at.time().minute(), 0)
            .map(|naive| chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc))
            .unwrap_or(sample.captured_at);
        let bucket = buckets.entry(minute).or_insert_with(|| MinuteBucket {
            minute,
            active_connections: 0,
            total_connections: 0,
            cache_hits: 0,
            cache_misses: 0,
            errors: 0,
            total_requests: 0,
            connect_requests: 0,
            responses_2xx: 0,
            responses_3xx: 0,
            responses_4xx: 0,
            responses_5xx: 0,
            err_connect_fail: 0,
            err_client_abort: 0,
            broken_server_conns: 0,
            bytes_in: 0,
            bytes_out: 0,
        });
        bucket.active_connections = sample.active_connections;
        bucket.total_connections += sample.total_connections;
        bucket.cache_hits += sample.cache_hits;
        bucket.cache_misses += sample.cache_misses;
        bucket.errors += sample.errors;
        bucket.total_requests += sample.total_requests;
        bucket.connect_requests += sample.connect_requests;
        bucket.responses_2xx += sample.responses_2xx;
        bucket.responses_3xx += sample.responses_3xx;
        bucket.responses_4xx += sample.responses_4xx;
        bucket.responses_5xx += sample.responses_5xx;
        bucket.err_connect_fail += sample.err_connect_fail;
        bucket.err_client_abort += sample.err_client_abort;
        bucket.broken_server_conns += sample.broken_server_conns;
        bucket.bytes_in += sample.bytes_in;
        bucket.bytes_out += sample.bytes_out;
    }
    buckets.into_values().collect()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDetail {
    #[serde(flatten)]
    pub proxy: Proxy,
    pub history: Vec<MinuteBucket>,
}

#[utoipa::path(
    get,
    path = "/api/v1/proxies/{id}",
    responses(
        (status = 200, description = "Proxy detail with per-minute stats history"),
        (status = 404, description = "No such proxy"),
    ),
    tags = ["proxies"],
    operation_id = "get_proxy",
)]
#[get("/proxies/{id}")]
pub async fn get(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let proxy = state
        .proxy_query
        .find_by_id(id.into())
        .await
        .map_err(|err| Error::internal(format!("fleet repository error: {err}")))?
        .ok_or_else(|| Error::not_found(format!("proxy {id}")))?;
    let since = chrono::Utc::now() - chrono::Duration::hours(1);
    let samples = state
        .proxy_stats
        .samples_since(proxy.id, since)
        .await
        .map_err(|err| Error::internal(format!("proxy stats repository error: {err}")))?;
    Ok(HttpResponse::Ok().json(ProxyDetail {
        history: bucket_by_minute(&samples),
        proxy,
    }))
}

/// Body of `POST /api/v1/proxies/{id}/logs`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartCaptureRequest {
    pub duration_minutes: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/proxies/{id}/logs",
    request_body = StartCaptureRequest,
    responses(
        (status = 200, description = "Capture window extended"),
        (status = 400, description = "duration_minutes out of [1,5]"),
    ),
    tags = ["proxies"],
    operation_id = "start_proxy_log_capture",
)]
#[post("/proxies/{id}/logs")]
pub async fn start_log_capture(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<String>,
    payload: web::Json<StartCaptureRequest>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let duration = payload.into_inner().duration_minutes;
    if !(MIN_CAPTURE_MINUTES..=MAX_CAPTURE_MINUTES).contains(&duration) {
        return Err(Error::bad_request(format!(
            "duration_minutes must be within [{MIN_CAPTURE_MINUTES}, {MAX_CAPTURE_MINUTES}]"
        )));
    }
    let requested_until = chrono::Utc::now() + chrono::Duration::minutes(duration);
    let proxy = state
        .registry
        .request_log_capture(id.into(), requested_until)
        .await?;
    Ok(HttpResponse::Ok().json(proxy))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListLogsQuery {
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/proxies/{id}/logs",
    params(ListLogsQuery),
    responses((status = 200, description = "Stored captured log lines")),
    tags = ["proxies"],
    operation_id = "list_proxy_logs",
)]
#[get("/proxies/{id}/logs")]
pub async fn list_logs(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<String>,
    query: web::Query<ListLogsQuery>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let limit = query.into_inner().limit.unwrap_or(DEFAULT_LOG_LIMIT);
    let lines = state
        .proxy_logs
        .list(id.into(), limit)
        .await
        .map_err(|err| Error::internal(format!("proxy log repository error: {err}")))?;
    Ok(HttpResponse::Ok().json(lines))
}

/// Body of `PUT /api/v1/proxies/{id}/config`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignConfigRequest {
    /// Configuration id to assign, or `None` to unassign.
    pub config_id: Option<String>,
}

#[utoipa::path(
    put,
    path = "/api/v1/proxies/{id}/config",
    request_body = AssignConfigRequest,
    responses(
        (status = 200, description = "Assignment updated"),
        (status = 403, description = "Admin privileges required"),
    ),
    tags = ["proxies"],
    operation_id = "assign_proxy_config",
)]
#[put("/proxies/{id}/config")]
pub async fn assign_config(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
    payload: web::Json<AssignConfigRequest>,
) -> ApiResult<HttpResponse> {
    require_admin(&user.0)?;
    let id = parse_uuid(id.into_inner(), "id")?;
    let config_id = payload
        .into_inner()
        .config_id
        .map(|raw| parse_uuid(raw, "configId"))
        .transpose()?
        .map(Into::into);
    let proxy = state
        .proxy_command
        .assign_config(id.into(), config_id)
        .await
        .map_err(|err| Error::internal(format!("fleet repository error: {err}")))?;
    Ok(HttpResponse::Ok().json(proxy))
}

#[utoipa::path(
    delete,
    path = "/api/v1/proxies/{id}",
    responses(
        (status = 204, description = "Proxy unregistered"),
        (status = 403, description = "Admin privileges required"),
    ),
    tags = ["proxies"],
    operation_id = "delete_proxy",
)]
#[delete("/proxies/{id}")]
pub async fn delete(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&user.0)?;
    let id = parse_uuid(id.into_inner(), "id")?;
    state
        .proxy_command
        .delete(id.into())
        .await
        .map_err(|err| Error::internal(format!("fleet repository error: {err}")))?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(total_requests: i64, bytes_out: i64, err_connect_fail: i64, active_connections: i64) -> ProxySample {
        ProxySample {
            proxy_id: crate::domain::ids::ProxyId::new(),
            captured_at: chrono::Utc::now(),
            active_connections,
            total_connections: 0,
            cache_hits: 0,
            cache_misses: 0,
            errors: 0,
            total_requests,
            connect_requests: 0,
            responses_2xx: 0,
            responses_3xx: 0,
            responses_4xx: 0,
            responses_5xx: 0,
            err_connect_fail,
            err_client_abort: 0,
            broken_server_conns: 0,
            bytes_in: 0,
            bytes_out,
        }
    }

    #[test]
    fn stats_summary_sums_samples() {
        let samples = vec![sample(10, 1_000, 1, 3), sample(5, 500, 0, 7)];
        let summary = StatsSummary::summarize(&samples);
        assert_eq!(summary.total_requests, 15);
        assert_eq!(summary.bytes_out, 1_500);
        assert_eq!(summary.err_connect_fail, 1);
        assert_eq!(summary.active_connections, 7);
        assert_eq!(summary.sample_count, 2);
    }
}
