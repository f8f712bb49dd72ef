//! Configuration CRUD and lifecycle transition handlers.
//!
//! ```text
//! GET    /api/v1/configs
//! POST   /api/v1/configs
//! GET    /api/v1/configs/{id}
//! PUT    /api/v1/configs/{id}
//! DELETE /api/v1/configs/{id}
//! POST   /api/v1/configs/{id}/submit
//! POST   /api/v1/configs/{id}/approve
//! POST   /api/v1/configs/{id}/reject
//! POST   /api/v1/configs/{id}/clone
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::config::{ConfigurationWithRules, NewConfiguration, RuleSet};
use crate::domain::ports::ConfigListFilter;
use crate::domain::{Error, Role, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_uuid, parse_uuid_list};

/// Query parameters accepted by `GET /api/v1/configs`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListConfigsQuery {
    pub status: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// Body of `POST /api/v1/configs/{id}/approve`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    /// Proxies the approved configuration should be assigned to.
    pub proxy_ids: Vec<String>,
}

const DEFAULT_LIST_LIMIT: u32 = 50;

fn require_admin(user: &User) -> ApiResult<()> {
    if user.role >= Role::Admin {
        Ok(())
    } else {
        Err(Error::forbidden("admin privileges required"))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/configs",
    params(ListConfigsQuery),
    responses((status = 200, description = "Configurations matching the filter")),
    tags = ["configs"],
    operation_id = "list_configs",
)]
#[get("/configs")]
pub async fn list(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    query: web::Query<ListConfigsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let filter = ConfigListFilter {
        status: query.status,
        cursor: query.cursor,
        limit: query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
    };
    let configs = state.config_query.list(filter).await.map_err(|err| {
        Error::internal(format!("failed to list configurations: {err}"))
    })?;
    Ok(HttpResponse::Ok().json(configs))
}

#[utoipa::path(
    post,
    path = "/api/v1/configs",
    request_body = NewConfiguration,
    responses((status = 201, description = "Draft created")),
    tags = ["configs"],
    operation_id = "create_config",
)]
#[post("/configs")]
pub async fn create(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    payload: web::Json<NewConfiguration>,
) -> ApiResult<HttpResponse> {
    let config = state
        .lifecycle
        .create(payload.into_inner(), user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(config))
}

#[utoipa::path(
    get,
    path = "/api/v1/configs/{id}",
    responses(
        (status = 200, description = "Configuration detail with rules"),
        (status = 404, description = "No such configuration"),
    ),
    tags = ["configs"],
    operation_id = "get_config",
)]
#[get("/configs/{id}")]
pub async fn get(
    state: web::Data<HttpState>,
    _user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let config: Option<ConfigurationWithRules> = state
        .config_query
        .get(id.into())
        .await
        .map_err(|err| Error::internal(format!("failed to fetch configuration: {err}")))?;
    match config {
        Some(config) => Ok(HttpResponse::Ok().json(config)),
        None => Err(Error::not_found(format!("configuration {id}"))),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/configs/{id}",
    request_body = RuleSet,
    responses(
        (status = 200, description = "Rules replaced"),
        (status = 400, description = "Configuration is not editable"),
        (status = 404, description = "No such configuration"),
    ),
    tags = ["configs"],
    operation_id = "update_config_rules",
)]
#[put("/configs/{id}")]
pub async fn update_rules(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
    payload: web::Json<RuleSet>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let config = state
        .lifecycle
        .update_rules(id.into(), payload.into_inner(), user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(config))
}

#[utoipa::path(
    delete,
    path = "/api/v1/configs/{id}",
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 400, description = "Configuration has been submitted"),
        (status = 403, description = "Admin privileges required"),
    ),
    tags = ["configs"],
    operation_id = "delete_config",
)]
#[delete("/configs/{id}")]
pub async fn delete(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    require_admin(&user.0)?;
    let id = parse_uuid(id.into_inner(), "id")?;
    state
        .lifecycle
        .delete(id.into(), user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/configs/{id}/submit",
    responses((status = 200, description = "Draft submitted for review")),
    tags = ["configs"],
    operation_id = "submit_config",
)]
#[post("/configs/{id}/submit")]
pub async fn submit(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let config = state
        .lifecycle
        .submit(id.into(), user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(config))
}

#[utoipa::path(
    post,
    path = "/api/v1/configs/{id}/approve",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Configuration activated"),
        (status = 403, description = "Not the submitting user, or insufficient role"),
    ),
    tags = ["configs"],
    operation_id = "approve_config",
)]
#[post("/configs/{id}/approve")]
pub async fn approve(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
    payload: web::Json<ApproveRequest>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let proxy_ids = parse_uuid_list(payload.into_inner().proxy_ids, "proxyIds")?
        .into_iter()
        .map(Into::into)
        .collect();
    let config = state
        .lifecycle
        .approve(id.into(), user.0.role, user.0.id, proxy_ids, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(config))
}

#[utoipa::path(
    post,
    path = "/api/v1/configs/{id}/reject",
    responses((status = 200, description = "Configuration returned to draft")),
    tags = ["configs"],
    operation_id = "reject_config",
)]
#[post("/configs/{id}/reject")]
pub async fn reject(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let config = state
        .lifecycle
        .reject(id.into(), user.0.role, user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(config))
}

#[utoipa::path(
    post,
    path = "/api/v1/configs/{id}/clone",
    responses((status = 201, description = "New draft created from source")),
    tags = ["configs"],
    operation_id = "clone_config",
)]
#[post("/configs/{id}/clone")]
pub async fn clone(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = parse_uuid(id.into_inner(), "id")?;
    let config = state
        .lifecycle
        .clone(id.into(), user.0.id, chrono::Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(config))
}
