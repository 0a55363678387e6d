//! Fallback responses for unavailable backend services
//!
//! Targets for circuit breakers in front of the backend routes. Each answers
//! 503 with a short JSON description of which service is down.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ErrorResponse;

/// Backend services the gateway fronts
pub const BACKEND_SERVICES: [&str; 5] = ["identity", "product", "cart", "order", "payment"];

#[derive(Debug, Serialize, ToSchema)]
pub struct FallbackResponse {
    pub error: &'static str,
    pub message: String,
    pub timestamp: String,
    pub status: u16,
}

fn display_name(service: &str) -> String {
    let mut chars = service.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// GET|POST /fallback/{service}
#[utoipa::path(
    get,
    path = "/fallback/{service}",
    tag = "system",
    params(
        ("service" = String, Path, description = "Backend service name: identity, product, cart, order or payment")
    ),
    responses(
        (status = 503, description = "Backend service unavailable", body = FallbackResponse),
        (status = 404, description = "Unknown service", body = ErrorResponse)
    )
)]
pub async fn service_fallback(service: web::Path<String>) -> HttpResponse {
    let service = service.into_inner();

    if !BACKEND_SERVICES.contains(&service.as_str()) {
        return HttpResponse::NotFound().json(ErrorResponse::new(
            "not_found",
            format!("No fallback configured for service '{}'", service),
        ));
    }

    HttpResponse::ServiceUnavailable().json(FallbackResponse {
        error: "Service Unavailable",
        message: format!("{} service is temporarily unavailable", display_name(&service)),
        timestamp: Utc::now().to_rfc3339(),
        status: 503,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test as actix_test, App};

    #[actix_rt::test]
    async fn test_known_service_is_unavailable() {
        let app = actix_test::init_service(
            App::new().route("/fallback/{service}", web::post().to(service_fallback)),
        )
        .await;

        let req = actix_test::TestRequest::post().uri("/fallback/payment").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["message"], "Payment service is temporarily unavailable");
        assert_eq!(body["status"], 503);
    }

    #[actix_rt::test]
    async fn test_unknown_service_is_not_found() {
        let app = actix_test::init_service(
            App::new().route("/fallback/{service}", web::get().to(service_fallback)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/fallback/inventory").to_request();
        assert_eq!(actix_test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("identity"), "Identity");
        assert_eq!(display_name(""), "");
    }
}
