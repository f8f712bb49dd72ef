//! Bearer-token authentication handlers.
//!
//! ```text
//! POST /api/v1/auth/login   {"email":"...", "password":"..."}
//! POST /api/v1/auth/refresh {"refresh_token":"..."}
//! POST /api/v1/auth/beacon
//! POST /api/v1/auth/logout
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{Error, LoginCredentials, LoginValidationError, User};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedUser;
use crate::inbound::http::state::HttpState;

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body for a successful login or refresh.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// Same value as `token`: this service issues a single bearer token
    /// type, so "refreshing" exchanges one token for another rather than
    /// extending a separate long-lived credential.
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: User,
}

/// Request body for `POST /api/v1/auth/refresh`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response body for `POST /api/v1/auth/refresh`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: i64,
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyEmail => Error::bad_request("email must not be empty")
            .with_details(json!({ "field": "email" })),
        LoginValidationError::EmptyPassword => Error::bad_request("password must not be empty")
            .with_details(json!({ "field": "password" })),
    }
}

fn expires_in_seconds(expires_at: chrono::DateTime<chrono::Utc>) -> i64 {
    (expires_at - chrono::Utc::now()).num_seconds().max(0)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid credentials"),
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/auth/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let credentials = LoginCredentials::try_from_parts(payload.email, payload.password)
        .map_err(map_login_validation_error)?;
    let outcome = state.authentication.login(credentials).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        token: outcome.token.clone(),
        refresh_token: outcome.token,
        expires_in: expires_in_seconds(outcome.expires_at),
        user: outcome.user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Refresh success", body = RefreshResponse),
        (status = 401, description = "Invalid or expired token"),
    ),
    tags = ["auth"],
    operation_id = "refresh",
    security([])
)]
#[post("/auth/refresh")]
pub async fn refresh(
    state: web::Data<HttpState>,
    payload: web::Json<RefreshRequest>,
) -> ApiResult<HttpResponse> {
    let outcome = state
        .authentication
        .refresh(&payload.refresh_token)
        .await?;
    Ok(HttpResponse::Ok().json(RefreshResponse {
        token: outcome.token,
        expires_in: expires_in_seconds(outcome.expires_at),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/beacon",
    responses((status = 204, description = "Session is still alive")),
    tags = ["auth"],
    operation_id = "beacon",
)]
#[post("/auth/beacon")]
pub async fn beacon(_user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses((status = 204, description = "Session revoked")),
    tags = ["auth"],
    operation_id = "logout",
)]
#[post("/auth/logout")]
pub async fn logout(
    state: web::Data<HttpState>,
    req: actix_web::HttpRequest,
) -> ApiResult<HttpResponse> {
    if let Some(token) = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        state.authentication.logout(token).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_in_seconds_never_negative() {
        let past = chrono::Utc::now() - chrono::Duration::hours(1);
        assert_eq!(expires_in_seconds(past), 0);
    }
}
