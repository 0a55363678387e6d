//! Rate Limiting Middleware helpers
//!
//! Response headers and the 429 body for the fixed-window limiter.

use actix_web::{
    http::header::{HeaderMap, HeaderName, HeaderValue},
    HttpResponse,
};

use crate::admission::{Admission, WindowSnapshot};
use crate::error::ErrorResponse;

/// Rate limit headers
pub const RATE_LIMIT_LIMIT: &str = "X-RateLimit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const RETRY_AFTER: &str = "Retry-After";

/// Add rate limit headers to an admitted response
pub fn add_rate_limit_headers(headers: &mut HeaderMap, snapshot: &WindowSnapshot) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(snapshot.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(snapshot.remaining),
    );
}

/// Create rate limit exceeded response with proper headers
pub fn rate_limit_exceeded_response(snapshot: &WindowSnapshot) -> HttpResponse {
    let retry_after = snapshot.retry_after_secs();

    HttpResponse::TooManyRequests()
        .insert_header((RATE_LIMIT_LIMIT, snapshot.limit.to_string()))
        .insert_header((RATE_LIMIT_REMAINING, "0"))
        .insert_header((RETRY_AFTER, retry_after.to_string()))
        .json(ErrorResponse::new(
            Admission::RateLimited.error_code(),
            format!(
                "Rate limit exceeded. Maximum {} requests per window.",
                snapshot.limit
            ),
        ))
}
