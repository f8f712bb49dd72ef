//! Liveness endpoint used by operator tooling and the sidecar's connectivity
//! monitor alike.
//!
//! ```text
//! GET /health
//! ```

use actix_web::{HttpResponse, get};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub server_time: chrono::DateTime<chrono::Utc>,
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
    tags = ["health"],
    operation_id = "health",
    security([])
)]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        server_time: chrono::Utc::now(),
    })
}
