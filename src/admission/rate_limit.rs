//! Per-identity fixed-window rate limiting stage

use std::net::IpAddr;
use std::sync::Arc;

use super::{Admission, CounterRegistry, WindowSnapshot};
use crate::config::RateLimitSettings;

/// Identity used when neither forwarding nor socket information is known.
/// All such requests share one bucket.
pub const UNKNOWN_REMOTE: &str = "unknown";

/// Burst budget per fixed window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests admitted per window. Zero or negative admits nothing.
    pub burst_capacity: i64,
    pub window_millis: u64,
}

impl RateLimitPolicy {
    pub fn new(burst_capacity: i64, window_millis: u64) -> Self {
        Self {
            burst_capacity,
            window_millis: window_millis.max(1),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.burst_capacity, settings.window_millis)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(20, 1000)
    }
}

/// Derive the rate-limit bucket for a request.
///
/// Precedence: explicit API key, then the first `X-Forwarded-For` hop, then
/// the socket peer address.
pub fn resolve_identity(
    api_key: Option<&str>,
    forwarded_for: Option<&str>,
    remote: Option<IpAddr>,
) -> String {
    if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
        return format!("api:{}", key);
    }

    let first_hop = forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    if let Some(hop) = first_hop {
        return format!("xff:{}", hop);
    }

    match remote {
        Some(ip) => format!("ip:{}", ip),
        None => format!("ip:{}", UNKNOWN_REMOTE),
    }
}

#[derive(Clone)]
pub struct RateLimitStage {
    registry: Arc<CounterRegistry>,
    policy: RateLimitPolicy,
}

impl RateLimitStage {
    pub fn new(registry: Arc<CounterRegistry>, policy: RateLimitPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn registry(&self) -> &Arc<CounterRegistry> {
        &self.registry
    }

    /// Count one request against `identity` and report the window state
    pub fn check(&self, identity: &str) -> WindowSnapshot {
        let counter = self.registry.get_or_create(identity);
        counter.try_acquire(
            self.registry.now_millis(),
            self.policy.burst_capacity,
            self.policy.window_millis,
        )
    }

    pub fn check_and_admit(&self, identity: &str) -> Admission {
        if self.check(identity).admitted {
            Admission::Allowed
        } else {
            Admission::RateLimited
        }
    }
}
