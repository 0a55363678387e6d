//! API Middleware Module
//!
//! Request admission for the gateway: API-key authentication followed by
//! per-identity rate limiting, ahead of any route handler.

pub mod auth;
pub mod rate_limit;
pub mod service;

pub use auth::{extract_api_key, extract_forwarded_for, rejection_status, FORWARDED_FOR_HEADER};
pub use rate_limit::{
    add_rate_limit_headers, rate_limit_exceeded_response,
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RETRY_AFTER,
};
pub use service::AdmissionMiddleware;
