//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::handlers::{fallback::FallbackResponse, health::HealthResponse};
use crate::error::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "API Gateway",
        version = "1.0.0",
        description = "Admission gateway in front of the identity, product, cart, order and payment services",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "Gateway health and fallback endpoints")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::fallback::service_fallback,
    ),
    components(
        schemas(
            HealthResponse,
            FallbackResponse,
            ErrorResponse,
        )
    )
)]
pub struct ApiDoc;
