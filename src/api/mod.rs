//! API module - HTTP routes and handlers

pub mod handlers;
pub mod middleware;
pub mod openapi;

use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;

/// Configure gateway-local routes. Everything else belongs to the routing
/// stage behind admission.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health::health_check))
        .service(
            web::resource("/fallback/{service}")
                .route(web::get().to(handlers::fallback::service_fallback))
                .route(web::post().to(handlers::fallback::service_fallback)),
        )
        // Swagger UI and OpenAPI spec
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}")
                .url("/api-docs/openapi.json", ApiDoc::openapi())
        );
}
