//! Bearer token extraction and role checks for HTTP handlers.
//!
//! Keeps Actix-specific request parsing out of the route handlers: a
//! handler asks for an [`AuthenticatedUser`] and gets back the resolved
//! operator account, or a `401`/`403` before the handler body ever runs.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::LocalBoxFuture;

use crate::domain::{Error, Role, User};

use super::state::HttpState;

const AUTH_HEADER: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

fn bearer_token(req: &HttpRequest) -> Result<&str, Error> {
    let header = req
        .headers()
        .get(AUTH_HEADER)
        .ok_or_else(|| Error::unauthorized("missing authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| Error::unauthorized("authorization header is not valid UTF-8"))?;
    value
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::unauthorized("authorization header must be a bearer token"))
}

/// The operator account resolved from a request's bearer token.
///
/// Extracting this type authenticates the request; handlers that also need
/// an authorisation level should call [`Self::require_role`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    /// Require the account to hold at least `role`, per [`Role`]'s ordering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::forbidden`] if the account's role is lower than
    /// `role`.
    pub fn require_role(&self, role: Role) -> Result<(), Error> {
        if self.0.role >= role {
            Ok(())
        } else {
            Err(Error::forbidden("insufficient privileges"))
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = req
                .app_data::<actix_web::web::Data<HttpState>>()
                .cloned()
                .ok_or_else(|| Error::internal("http state missing from request"))?;
            let token = bearer_token(&req)?.to_owned();
            let user = state.authentication.authenticate(&token).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header;
    use actix_web::test::TestRequest;

    #[test]
    fn rejects_missing_header() {
        let req = TestRequest::default().to_http_request();
        let err = bearer_token(&req).unwrap_err();
        assert_eq!(err.code(), crate::domain::ErrorCode::Unauthorized);
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert!(bearer_token(&req).is_err());
    }

    #[test]
    fn extracts_bearer_token() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer atsctl_abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req).unwrap(), "atsctl_abc123");
    }

    #[test]
    fn rejects_empty_bearer_token() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert!(bearer_token(&req).is_err());
    }
}
