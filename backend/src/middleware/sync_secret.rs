//! Optional shared-secret check for the unauthenticated sidecar sync surface.
//!
//! The sync protocol has no bearer-token auth by design (it runs on a
//! trusted network segment). When `SYNC_SHARED_SECRET` is configured, every
//! sync request must carry a matching `X-Fleet-Sync-Secret` header; when
//! unset, the middleware passes every request through unchanged, preserving
//! the protocol's default open behaviour.

use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::HeaderName;
use actix_web::{Error, HttpResponse};
use futures_util::future::{ready, LocalBoxFuture, Ready};

const SECRET_HEADER: &str = "x-fleet-sync-secret";

/// Middleware enforcing an optional shared secret on the sync routes.
#[derive(Clone)]
pub struct SyncSecret {
    expected: Option<String>,
}

impl SyncSecret {
    /// Build the middleware from a configured secret, if any.
    #[must_use]
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SyncSecret
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SyncSecretMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SyncSecretMiddleware {
            service,
            expected: self.expected.clone(),
        }))
    }
}

/// Service wrapper produced by [`SyncSecret`].
pub struct SyncSecretMiddleware<S> {
    service: S,
    expected: Option<String>,
}

impl<S, B> Service<ServiceRequest> for SyncSecretMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(expected) = self.expected.clone() else {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        };

        let presented = req
            .headers()
            .get(HeaderName::from_static(SECRET_HEADER))
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        if presented.as_deref() == Some(expected.as_str()) {
            let fut = self.service.call(req);
            Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
        } else {
            let (http_req, _) = req.into_parts();
            let response = HttpResponse::Unauthorized().finish().map_into_right_body();
            Box::pin(async move { Ok(ServiceResponse::new(http_req, response)) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};
    use actix_web::{App, HttpResponse, test, web};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn passes_through_when_unconfigured() {
        let app = test::init_service(
            App::new()
                .wrap(SyncSecret::new(None))
                .route("/", web::get().to(ok)),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
    }

    #[actix_web::test]
    async fn rejects_missing_header_when_configured() {
        let app = test::init_service(
            App::new()
                .wrap(SyncSecret::new(Some("s3cret".to_owned())))
                .route("/", web::get().to(ok)),
        )
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn accepts_matching_header() {
        let app = test::init_service(
            App::new()
                .wrap(SyncSecret::new(Some("s3cret".to_owned())))
                .route("/", web::get().to(ok)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header((
                HeaderName::from_static(SECRET_HEADER),
                HeaderValue::from_static("s3cret"),
            ))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.status().is_success());
    }
}
