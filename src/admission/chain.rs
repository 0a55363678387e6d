//! Ordered composition of the admission stages

use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use super::{
    resolve_identity, Admission, AuthenticationStage, Clock, CounterRegistry, KeyStore,
    RateLimitPolicy, RateLimitStage, WindowSnapshot,
};
use crate::config::Settings;

/// What the chain needs to know about an inbound request
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestFacts<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Value of the configured API-key header
    pub api_key: Option<&'a str>,
    pub forwarded_for: Option<&'a str>,
    pub remote_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Start,
    Authenticated,
    RateChecked,
    /// Handed to routing
    Forwarded,
    Rejected(Admission),
}

impl ChainState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Forwarded | ChainState::Rejected(_))
    }
}

/// Final state plus the rate-limit window, when the request got that far
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub state: ChainState,
    pub identity: Option<String>,
    pub rate: Option<WindowSnapshot>,
}

impl ChainOutcome {
    pub fn admission(&self) -> Admission {
        match self.state {
            ChainState::Rejected(outcome) => outcome,
            _ => Admission::Allowed,
        }
    }

    /// Identity fit for logs: the API key itself is masked
    pub fn log_identity(&self) -> Option<String> {
        self.identity.as_deref().map(|identity| {
            if identity.starts_with("api:") {
                "api:<redacted>".to_string()
            } else {
                identity.to_string()
            }
        })
    }
}

/// Authentication strictly before rate limiting, short-circuiting on the
/// first rejection.
#[derive(Clone)]
pub struct FilterChain {
    auth: AuthenticationStage,
    rate_limit: RateLimitStage,
}

impl FilterChain {
    pub fn new(auth: AuthenticationStage, rate_limit: RateLimitStage) -> Self {
        Self { auth, rate_limit }
    }

    /// Wire both stages from configuration around one shared registry
    pub fn from_settings(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        let keys = Arc::new(KeyStore::from_settings(&settings.security));
        let registry = Arc::new(CounterRegistry::new(
            settings.rate_limit.registry_max_size,
            settings.rate_limit.idle_timeout(),
            clock,
        ));

        Self::new(
            AuthenticationStage::new(keys),
            RateLimitStage::new(registry, RateLimitPolicy::from_settings(&settings.rate_limit)),
        )
    }

    pub fn auth(&self) -> &AuthenticationStage {
        &self.auth
    }

    pub fn rate_limit(&self) -> &RateLimitStage {
        &self.rate_limit
    }

    pub fn evaluate(&self, facts: &RequestFacts<'_>) -> ChainOutcome {
        let mut outcome = ChainOutcome {
            state: ChainState::Start,
            identity: None,
            rate: None,
        };

        while !outcome.state.is_terminal() {
            let next = self.advance(facts, &mut outcome);
            outcome.state = next;
        }

        debug!(
            method = facts.method,
            path = facts.path,
            state = ?outcome.state,
            "Admission evaluated"
        );
        outcome
    }

    fn advance(&self, facts: &RequestFacts<'_>, outcome: &mut ChainOutcome) -> ChainState {
        match outcome.state {
            ChainState::Start => match self.auth.authenticate(facts.path, facts.api_key) {
                Admission::Allowed => ChainState::Authenticated,
                rejected => ChainState::Rejected(rejected),
            },
            ChainState::Authenticated => {
                let identity = resolve_identity(facts.api_key, facts.forwarded_for, facts.remote_ip);
                let snapshot = self.rate_limit.check(&identity);
                outcome.identity = Some(identity);
                outcome.rate = Some(snapshot);
                if snapshot.admitted {
                    ChainState::RateChecked
                } else {
                    ChainState::Rejected(Admission::RateLimited)
                }
            }
            ChainState::RateChecked => ChainState::Forwarded,
            terminal => terminal,
        }
    }
}
