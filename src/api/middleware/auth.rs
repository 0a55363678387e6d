//! API Key Authentication Middleware helpers
//!
//! Reads the configured API-key header and the forwarding chain from the
//! request, and maps authentication outcomes to HTTP statuses.

use actix_web::{dev::ServiceRequest, http::StatusCode};

use crate::admission::Admission;
use crate::config::MissingKeysStatus;

/// Header carrying the client chain set by upstream proxies
pub const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// First value of the configured API-key header, if it is valid UTF-8
pub fn extract_api_key<'a>(req: &'a ServiceRequest, header_name: &str) -> Option<&'a str> {
    req.headers()
        .get(header_name)
        .and_then(|value| value.to_str().ok())
}

pub fn extract_forwarded_for(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// HTTP status for a rejected admission.
///
/// `Unauthenticated` maps to 401 unless the deployment asks for 403.
pub fn rejection_status(outcome: Admission, missing_keys: MissingKeysStatus) -> Option<StatusCode> {
    match (outcome, missing_keys) {
        (Admission::Unauthenticated, MissingKeysStatus::Forbidden) => Some(StatusCode::FORBIDDEN),
        _ => outcome.status_code(),
    }
}
