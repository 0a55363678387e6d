//! Admission Middleware Service
//!
//! Actix-web middleware that runs the admission filter chain in front of
//! every route. Authentication is evaluated before rate limiting and the
//! first rejection short-circuits the request.

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpResponse,
};
use futures::future::{ok, Ready, LocalBoxFuture};
use std::rc::Rc;
use tracing::warn;

use crate::admission::{Admission, ChainState, FilterChain, RequestFacts, WindowSnapshot};
use crate::config::MissingKeysStatus;
use crate::error::ErrorResponse;
use super::auth::{extract_api_key, extract_forwarded_for, rejection_status};
use super::rate_limit::{add_rate_limit_headers, rate_limit_exceeded_response};

/// Middleware factory for API-key authentication and rate limiting
#[derive(Clone)]
pub struct AdmissionMiddleware {
    chain: FilterChain,
    missing_keys: MissingKeysStatus,
}

impl AdmissionMiddleware {
    pub fn new(chain: FilterChain) -> Self {
        Self {
            chain,
            missing_keys: MissingKeysStatus::default(),
        }
    }

    /// Choose the status used when no keys are configured
    pub fn with_missing_keys_status(mut self, status: MissingKeysStatus) -> Self {
        self.missing_keys = status;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Transform = AdmissionMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdmissionMiddlewareService {
            service: Rc::new(service),
            chain: self.chain.clone(),
            missing_keys: self.missing_keys,
        })
    }
}

/// The actual middleware service
pub struct AdmissionMiddlewareService<S> {
    service: Rc<S>,
    chain: FilterChain,
    missing_keys: MissingKeysStatus,
}

impl<S> AdmissionMiddlewareService<S> {
    fn rejection_response(&self, rejected: Admission, outcome_rate: Option<&WindowSnapshot>) -> HttpResponse {
        if let (Admission::RateLimited, Some(snapshot)) = (rejected, outcome_rate) {
            return rate_limit_exceeded_response(snapshot);
        }

        let status = rejection_status(rejected, self.missing_keys).unwrap_or(StatusCode::FORBIDDEN);
        let header_name = self.chain.auth().key_store().header_name();
        HttpResponse::build(status).json(ErrorResponse::for_admission(rejected, header_name))
    }
}

impl<S, B> Service<ServiceRequest> for AdmissionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut core::task::Context<'_>) -> core::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let outcome = {
            let header_name = self.chain.auth().key_store().header_name();
            let facts = RequestFacts {
                method: req.method().as_str(),
                path: req.path(),
                api_key: extract_api_key(&req, header_name),
                forwarded_for: extract_forwarded_for(&req),
                remote_ip: req.peer_addr().map(|addr| addr.ip()),
            };
            self.chain.evaluate(&facts)
        };

        if let ChainState::Rejected(rejected) = outcome.state {
            let identity = outcome.log_identity();
            warn!(
                method = %req.method(),
                path = %req.path(),
                outcome = rejected.error_code(),
                identity = identity.as_deref().unwrap_or("-"),
                "Request rejected at admission"
            );
            let response = self.rejection_response(rejected, outcome.rate.as_ref());
            return Box::pin(async move { Ok(req.into_response(response).map_into_right_body()) });
        }

        let service = self.service.clone();
        Box::pin(async move {
            let mut res = service.call(req).await?.map_into_left_body();
            if let Some(snapshot) = outcome.rate {
                add_rate_limit_headers(res.headers_mut(), &snapshot);
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{Clock, ManualClock};
    use crate::api::middleware::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RETRY_AFTER};
    use crate::config::Settings;
    use actix_web::{test, web, App};
    use std::sync::Arc;

    fn chain(keys: &[&str], burst: i64, clock: &ManualClock) -> FilterChain {
        let mut settings = Settings::default();
        settings.security.api_keys = keys.iter().map(|k| k.to_string()).collect();
        settings.rate_limit.burst_capacity = burst;
        let clock: Arc<dyn Clock> = Arc::new(clock.clone());
        FilterChain::from_settings(&settings, clock)
    }

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().body("routed")
    }

    macro_rules! admission_app {
        ($middleware:expr) => {
            test::init_service(
                App::new()
                    .wrap($middleware)
                    .route("/health", web::get().to(ok_handler))
                    .route("/api/x", web::get().to(ok_handler)),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_end_to_end_statuses() {
        let clock = ManualClock::new();
        let app = admission_app!(AdmissionMiddleware::new(chain(&["k1", "k2"], 2, &clock)));

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/x").to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/api/x")
                .insert_header(("X-API-Key", "k1"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header(("X-API-Key", "k1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(RETRY_AFTER).unwrap(), "1");

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header(("X-API-Key", "k2"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_window_reset_readmits() {
        let clock = ManualClock::new();
        let app = admission_app!(AdmissionMiddleware::new(chain(&["k1"], 1, &clock)));
        let keyed = || {
            test::TestRequest::get()
                .uri("/api/x")
                .insert_header(("X-API-Key", "k1"))
                .to_request()
        };

        assert_eq!(test::call_service(&app, keyed()).await.status(), StatusCode::OK);
        assert_eq!(test::call_service(&app, keyed()).await.status(), StatusCode::TOO_MANY_REQUESTS);

        clock.advance(1000);
        assert_eq!(test::call_service(&app, keyed()).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_no_keys_configured() {
        let clock = ManualClock::new();
        let app = admission_app!(AdmissionMiddleware::new(chain(&[], 5, &clock)));

        let req = test::TestRequest::get().uri("/api/x").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_no_keys_configured_forbidden_mode() {
        let clock = ManualClock::new();
        let middleware = AdmissionMiddleware::new(chain(&[], 5, &clock))
            .with_missing_keys_status(MissingKeysStatus::Forbidden);
        let app = admission_app!(middleware);

        let req = test::TestRequest::get().uri("/api/x").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_forbidden_body_and_no_budget_spent() {
        let clock = ManualClock::new();
        let chain = chain(&["k1"], 1, &clock);
        let registry = chain.rate_limit().registry().clone();
        let app = admission_app!(AdmissionMiddleware::new(chain));

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header(("X-API-Key", "bad"))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["error"], "forbidden");
        assert!(registry.is_empty());
    }

    #[actix_rt::test]
    async fn test_admitted_response_carries_rate_headers() {
        let clock = ManualClock::new();
        let app = admission_app!(AdmissionMiddleware::new(chain(&["k1"], 3, &clock)));

        let req = test::TestRequest::get()
            .uri("/api/x")
            .insert_header(("X-API-Key", "k1"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.headers().get(RATE_LIMIT_LIMIT).unwrap(), "3");
        assert_eq!(resp.headers().get(RATE_LIMIT_REMAINING).unwrap(), "2");
    }

    #[actix_rt::test]
    async fn test_forwarded_for_buckets() {
        let clock = ManualClock::new();
        let app = admission_app!(AdmissionMiddleware::new(chain(&["k1"], 1, &clock)));
        let from = |hop: &str| {
            test::TestRequest::get()
                .uri("/health")
                .insert_header(("X-Forwarded-For", hop.to_string()))
                .to_request()
        };

        assert_eq!(test::call_service(&app, from("10.0.0.1")).await.status(), StatusCode::OK);
        assert_eq!(
            test::call_service(&app, from("10.0.0.1, 172.16.0.9")).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(test::call_service(&app, from("10.0.0.2")).await.status(), StatusCode::OK);
    }
}
