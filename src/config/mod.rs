//! Configuration module for the gateway

use serde::{Deserialize, Deserializer};
use config::{Config, ConfigError, Environment, File};
use std::path::PathBuf;
use std::time::Duration;

/// Main application settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub security: SecuritySettings,
    pub rate_limit: RateLimitSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Status returned when the gateway has no API keys configured at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingKeysStatus {
    #[default]
    Unauthorized,
    Forbidden,
}

/// Paths that skip API-key authentication unless configured otherwise
pub const DEFAULT_ALLOWLIST: [&str; 4] = ["/health", "/fallback", "/swagger-ui", "/api-docs"];

/// API-key authentication
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Accepts a list or a single comma-separated string
    #[serde(deserialize_with = "string_or_list")]
    pub api_keys: Vec<String>,
    pub header_name: String,
    #[serde(deserialize_with = "string_or_list")]
    pub allowlist_paths: Vec<String>,
    pub missing_keys_status: MissingKeysStatus,
}

/// Fixed-window rate limiting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Requests per window per identity; non-positive admits nothing
    pub burst_capacity: i64,
    /// Kept for config compatibility; the fixed window does not use it
    pub replenish_rate: i64,
    pub window_millis: u64,
    pub registry_max_size: usize,
    pub registry_idle_evict_minutes: u64,
    pub sweep_interval_secs: u64,
}

impl RateLimitSettings {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_idle_evict_minutes * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl Settings {
    /// Load configuration from files and environment variables
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables (prefixed with GATEWAY_)
    /// 2. config/local.toml (gitignored)
    /// 3. config/default.toml
    pub fn load() -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"));

        let builder = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // GATEWAY_RATE_LIMIT__BURST_CAPACITY, GATEWAY_SECURITY__API_KEYS, ...
            // Values stay strings so numeric-looking keys such as "0123" survive;
            // typed fields are converted during deserialization.
            .add_source(
                Environment::with_prefix("GATEWAY")
                    .prefix_separator("_")
                    .separator("__")
            );

        builder.build()?.try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        SecuritySettings {
            api_keys: Vec::new(),
            header_name: "X-API-Key".to_string(),
            allowlist_paths: DEFAULT_ALLOWLIST.iter().map(|p| p.to_string()).collect(),
            missing_keys_status: MissingKeysStatus::Unauthorized,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        RateLimitSettings {
            burst_capacity: 20,
            replenish_rate: 10,
            window_millis: 1000,
            registry_max_size: 100_000,
            registry_idle_evict_minutes: 10,
            sweep_interval_secs: 60,
        }
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // A key like 12345 or `true` written unquoted in a config file is still a key
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    impl Scalar {
        fn into_text(self) -> String {
            match self {
                Scalar::Text(text) => text,
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(n) => n.to_string(),
                Scalar::Bool(b) => b.to_string(),
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(Scalar),
        Many(Vec<Scalar>),
    }

    let items = match StringOrList::deserialize(deserializer)? {
        StringOrList::One(joined) => joined
            .into_text()
            .split(',')
            .map(str::to_string)
            .collect::<Vec<_>>(),
        StringOrList::Many(items) => items.into_iter().map(Scalar::into_text).collect(),
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
