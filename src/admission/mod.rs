//! Request admission
//!
//! Decides, per inbound request, whether it is authenticated and within its
//! rate budget. Authentication always runs first so rejected requests never
//! consume rate-limit budget.

pub mod auth;
pub mod chain;
pub mod clock;
pub mod key_store;
pub mod rate_limit;
pub mod registry;
pub mod window;

pub use auth::AuthenticationStage;
pub use chain::{ChainState, FilterChain, RequestFacts};
pub use clock::{Clock, ManualClock, SystemClock};
pub use key_store::KeyStore;
pub use rate_limit::{resolve_identity, RateLimitPolicy, RateLimitStage};
pub use registry::CounterRegistry;
pub use window::{WindowCounter, WindowSnapshot};

use actix_web::http::StatusCode;

/// Outcome of an admission stage. A value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// No keys are configured at all (fail-closed)
    Unauthenticated,
    /// Key missing or not recognised
    Forbidden,
    RateLimited,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    /// Default HTTP status for a rejection. `None` when the request passes.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Admission::Allowed => None,
            Admission::Unauthenticated => Some(StatusCode::UNAUTHORIZED),
            Admission::Forbidden => Some(StatusCode::FORBIDDEN),
            Admission::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
        }
    }

    /// Machine-readable code used in rejection bodies and logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Admission::Allowed => "allowed",
            Admission::Unauthenticated => "unauthorized",
            Admission::Forbidden => "forbidden",
            Admission::RateLimited => "rate_limit_exceeded",
        }
    }
}
