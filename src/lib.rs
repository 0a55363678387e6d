//! API Gateway
//!
//! Request admission for the backend services: API-key authentication and
//! per-identity fixed-window rate limiting, evaluated in that order before
//! any routing happens.

pub mod admission;
pub mod api;
pub mod config;
pub mod error;

use crate::admission::FilterChain;

/// Application state shared across all handlers
pub struct AppState {
    pub chain: FilterChain,
}
