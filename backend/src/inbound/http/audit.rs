//! Audit log listing, admin and root only.
//!
//! ```text
//! GET /api/v1/audit
//! ```

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::ports::AuditListFilter;
use crate::domain::{Error, Role};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{parse_optional_rfc3339_timestamp, parse_uuid};

const DEFAULT_LIMIT: u32 = 50;

/// Query parameters accepted by `GET /api/v1/audit`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAuditQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/audit",
    params(ListAuditQuery),
    responses(
        (status = 200, description = "Audit entries matching the filter"),
        (status = 403, description = "Admin privileges required"),
    ),
    tags = ["audit"],
    operation_id = "list_audit",
)]
#[get("/audit")]
pub async fn list(
    state: web::Data<HttpState>,
    user: AuthenticatedUser,
    query: web::Query<ListAuditQuery>,
) -> ApiResult<HttpResponse> {
    if user.0.role < Role::Admin {
        return Err(Error::forbidden("admin privileges required"));
    }
    let query = query.into_inner();
    let entity_id = query
        .entity_id
        .map(|raw| parse_uuid(raw, "entityId"))
        .transpose()?;
    let user_id = query
        .user_id
        .map(|raw| parse_uuid(raw, "userId"))
        .transpose()?
        .map(Into::into);
    let from = parse_optional_rfc3339_timestamp(query.from, "from")?;
    let to = parse_optional_rfc3339_timestamp(query.to, "to")?;
    let filter = AuditListFilter {
        entity_type: query.entity_type,
        entity_id: entity_id.map(|id| id.to_string()),
        user_id,
        from,
        to,
        cursor: query.cursor,
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
    };
    let entries = state
        .audit
        .list(filter)
        .await
        .map_err(|err| Error::internal(format!("audit repository error: {err}")))?;
    Ok(HttpResponse::Ok().json(entries))
}
