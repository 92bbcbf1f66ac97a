use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpResponse,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use serde_json::json;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Requires `x-api-key` to match the configured key on the wrapped routes.
/// With no key configured every request passes.
#[derive(Clone, Default)]
pub struct ApiKeyGuard {
    expected: Option<Rc<str>>,
}

impl ApiKeyGuard {
    pub fn new(expected: Option<&str>) -> Self {
        Self {
            expected: expected.filter(|k| !k.is_empty()).map(Rc::from),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiKeyGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiKeyGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApiKeyGuardMiddleware {
            service: Rc::new(service),
            expected: self.expected.clone(),
        })
    }
}

pub struct ApiKeyGuardMiddleware<S> {
    service: Rc<S>,
    expected: Option<Rc<str>>,
}

impl<S, B> Service<ServiceRequest> for ApiKeyGuardMiddleware<S>
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
        let srv = self.service.clone();
        let expected = self.expected.clone();

        Box::pin(async move {
            // CORS preflight never carries credentials
            let allowed = req.method() == actix_web::http::Method::OPTIONS
                || match expected.as_deref() {
                    None => true,
                    Some(key) => req
                        .headers()
                        .get(API_KEY_HEADER)
                        .and_then(|h| h.to_str().ok())
                        .is_some_and(|provided| provided == key),
                };

            if allowed {
                return srv.call(req).await.map(|res| res.map_into_left_body());
            }

            warn!(path = %req.path(), "Rejected request with missing or invalid API key");
            let response = HttpResponse::Unauthorized().json(json!({
                "error": "Invalid API key",
                "code": "unauthorized",
            }));
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
