//! Static set of accepted API keys

use std::collections::HashSet;

use crate::config::SecuritySettings;

/// Default header carrying the API key
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Immutable after construction; shared read-only across all requests.
#[derive(Debug, Clone)]
pub struct KeyStore {
    valid_keys: HashSet<String>,
    header_name: String,
    bypass_prefixes: Vec<String>,
}

impl KeyStore {
    pub fn new<K, P>(keys: K, header_name: impl Into<String>, bypass_prefixes: P) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let valid_keys = keys
            .into_iter()
            .map(|k| Into::<String>::into(k).trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        let header_name = header_name.into();
        let header_name = if header_name.trim().is_empty() {
            DEFAULT_API_KEY_HEADER.to_string()
        } else {
            header_name
        };

        Self {
            valid_keys,
            header_name,
            bypass_prefixes: bypass_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_settings(settings: &SecuritySettings) -> Self {
        Self::new(
            settings.api_keys.iter().cloned(),
            settings.header_name.clone(),
            settings.allowlist_paths.iter().cloned(),
        )
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn has_keys(&self) -> bool {
        !self.valid_keys.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.valid_keys.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.valid_keys.contains(key)
    }

    /// True when `path` starts with any configured bypass prefix
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_keys_are_dropped() {
        let store = KeyStore::new(["k1", " ", ""], "X-API-Key", Vec::<String>::new());
        assert_eq!(store.key_count(), 1);
        assert!(store.contains("k1"));
    }

    #[test]
    fn test_blank_header_falls_back_to_default() {
        let store = KeyStore::new(["k1"], "  ", Vec::<String>::new());
        assert_eq!(store.header_name(), DEFAULT_API_KEY_HEADER);
    }

    #[test]
    fn test_bypass_is_prefix_match() {
        let store = KeyStore::new(Vec::<String>::new(), "X-API-Key", ["/actuator/health"]);
        assert!(store.is_bypassed("/actuator/health"));
        assert!(store.is_bypassed("/actuator/healthcheck"));
        assert!(!store.is_bypassed("/actuator/info"));
    }
}
