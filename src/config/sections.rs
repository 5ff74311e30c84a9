//! Runtime configuration sections.

use crate::storage::BreakerConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

/// Upstream news provider settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Provider API base URL.
    pub base_url: String,
    /// Provider API key.
    pub api_key: Option<SecretString>,
    /// Market filter sent with every request.
    pub country: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsdata.io/api/1".to_string(),
            api_key: None,
            country: Some("in".to_string()),
            timeout_secs: 10,
        }
    }
}

/// Threshold fetch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    /// Language used by recommendations and CLI defaults.
    pub default_language: String,
    /// Minimum articles assembled for a language.
    pub language_min_articles: usize,
    /// Minimum articles assembled for a domain.
    pub domain_min_articles: usize,
    /// Minimum articles assembled for a search.
    pub search_min_articles: usize,
    /// Page ceiling for language and domain fetches.
    pub max_attempts: u32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            language_min_articles: 75,
            domain_min_articles: 50,
            search_min_articles: 20,
            max_attempts: 15,
        }
    }
}

/// Durable cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map.
    #[default]
    Memory,
    /// Redis server.
    Redis,
}

impl CacheBackend {
    /// Parses a backend name, falling back to memory.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "redis" => Self::Redis,
            _ => Self::Memory,
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Which store holds cached payloads.
    pub backend: CacheBackend,
    /// Redis connection URL.
    pub redis_url: Option<String>,
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Keys the membership filter is sized for.
    pub filter_capacity: usize,
    /// Target false-positive rate at capacity.
    pub filter_false_positive_rate: f64,
    /// Circuit breaker around the store.
    pub breaker: BreakerConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            ttl_secs: 1800,
            filter_capacity: 10_000,
            filter_false_positive_rate: 0.01,
            breaker: BreakerConfig::default(),
        }
    }
}

/// History document store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map.
    Memory,
    /// `SQLite` database file.
    #[default]
    Sqlite,
}

impl StoreBackend {
    /// Parses a backend name, falling back to `SQLite`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" => Self::Memory,
            _ => Self::Sqlite,
        }
    }
}

/// History store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Which store holds user histories.
    pub backend: StoreBackend,
    /// Database file for the `SQLite` backend.
    pub sqlite_path: PathBuf,
    /// Conditional-write retries before a save fails.
    pub max_merge_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: default_sqlite_path(),
            max_merge_retries: 5,
        }
    }
}

fn default_sqlite_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".newsroom").join("history.db"),
        |dirs| dirs.data_dir().join("newsroom").join("history.db"),
    )
}

/// Recommendation sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendationConfig {
    /// Sources returned per recommendation.
    pub max_sources: usize,
    /// Articles returned per recommendation.
    pub max_articles: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_sources: 6,
            max_articles: 10,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// HMAC secret for bearer tokens.
    pub jwt_secret: Option<SecretString>,
    /// Expected `iss` claim.
    pub jwt_issuer: Option<String>,
    /// Expected `aud` claim.
    pub jwt_audience: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            jwt_secret: None,
            jwt_issuer: None,
            jwt_audience: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `newsroom=debug`.
    pub level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<String>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Install the Prometheus recorder.
    pub enabled: Option<bool>,
    /// Port for the scrape listener.
    pub port: Option<u16>,
}
