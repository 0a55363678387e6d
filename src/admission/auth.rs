//! API-key authentication stage

use std::sync::Arc;

use super::{Admission, KeyStore};

/// Stateless apart from the shared, read-only `KeyStore`
#[derive(Debug, Clone)]
pub struct AuthenticationStage {
    keys: Arc<KeyStore>,
}

impl AuthenticationStage {
    pub fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    /// Decide whether a request may proceed.
    ///
    /// Bypassed paths are allowed even when no keys are configured. Otherwise
    /// an empty key set rejects everything, and a missing, blank or unknown
    /// key is forbidden.
    pub fn authenticate(&self, path: &str, header_value: Option<&str>) -> Admission {
        if self.keys.is_bypassed(path) {
            return Admission::Allowed;
        }

        if !self.keys.has_keys() {
            return Admission::Unauthenticated;
        }

        match header_value {
            Some(key) if !key.trim().is_empty() && self.keys.contains(key) => Admission::Allowed,
            _ => Admission::Forbidden,
        }
    }
}
