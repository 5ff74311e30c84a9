//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. A `.env` file is loaded by the binary before
//! any of this runs.

mod sections;

pub use sections::{
    AggregationConfig, CacheBackend, CacheConfig, LoggingSettings, MetricsSettings,
    RecommendationConfig, ServerConfig, StoreBackend, StoreConfig, UpstreamConfig,
};

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for newsroom.
#[derive(Debug, Clone, Default)]
pub struct NewsroomConfig {
    /// Upstream provider.
    pub upstream: UpstreamConfig,
    /// Threshold fetching.
    pub aggregation: AggregationConfig,
    /// Response cache.
    pub cache: CacheConfig,
    /// History store.
    pub store: StoreConfig,
    /// Recommendation sizes.
    pub recommendations: RecommendationConfig,
    /// HTTP server.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// `[upstream]`
    pub upstream: Option<ConfigFileUpstream>,
    /// `[aggregation]`
    pub aggregation: Option<ConfigFileAggregation>,
    /// `[cache]`
    pub cache: Option<ConfigFileCache>,
    /// `[store]`
    pub store: Option<ConfigFileStore>,
    /// `[recommendations]`
    pub recommendations: Option<ConfigFileRecommendations>,
    /// `[server]`
    pub server: Option<ConfigFileServer>,
    /// `[logging]`
    pub logging: Option<LoggingSettings>,
    /// `[metrics]`
    pub metrics: Option<MetricsSettings>,
}

/// Upstream section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileUpstream {
    /// Base URL.
    pub base_url: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Country filter; empty disables it.
    pub country: Option<String>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Aggregation section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileAggregation {
    /// Default language.
    pub default_language: Option<String>,
    /// Language minimum.
    pub language_min_articles: Option<usize>,
    /// Domain minimum.
    pub domain_min_articles: Option<usize>,
    /// Search minimum.
    pub search_min_articles: Option<usize>,
    /// Page ceiling.
    pub max_attempts: Option<u32>,
}

/// Cache section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileCache {
    /// Backend name.
    pub backend: Option<String>,
    /// Redis URL.
    pub redis_url: Option<String>,
    /// TTL in seconds.
    pub ttl_secs: Option<u64>,
    /// Filter capacity.
    pub filter_capacity: Option<usize>,
    /// Filter false-positive rate.
    pub filter_false_positive_rate: Option<f64>,
    /// Breaker failure threshold.
    pub breaker_failure_threshold: Option<u32>,
    /// Breaker reset timeout.
    pub breaker_reset_timeout_ms: Option<u64>,
}

/// Store section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStore {
    /// Backend name.
    pub backend: Option<String>,
    /// `SQLite` path.
    pub sqlite_path: Option<String>,
    /// Merge retries.
    pub max_merge_retries: Option<u32>,
}

/// Recommendations section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRecommendations {
    /// Source count.
    pub max_sources: Option<usize>,
    /// Article count.
    pub max_articles: Option<usize>,
}

/// Server section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileServer {
    /// Bind address.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// JWT secret.
    pub jwt_secret: Option<String>,
    /// JWT issuer.
    pub jwt_issuer: Option<String>,
    /// JWT audience.
    pub jwt_audience: Option<String>,
}

impl NewsroomConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::failed("read_config_file", e))?;
        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| Error::failed("parse_config_file", e))?;
        Ok(Self::from_config_file(file).with_env_overrides())
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/newsroom/config.toml`.
    /// Falls back to defaults with env overrides if no file is found.
    #[must_use]
    pub fn load_default() -> Self {
        for candidate in Self::default_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "ignoring config file");
                },
            }
        }
        Self::default().with_env_overrides()
    }

    /// Candidate config file locations in lookup order.
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        vec![
            base_dirs.config_dir().join("newsroom").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("newsroom")
                .join("config.toml"),
        ]
    }

    /// Converts a `ConfigFile` to `NewsroomConfig`.
    #[must_use]
    pub fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(upstream) = file.upstream {
            if let Some(v) = upstream.base_url {
                config.upstream.base_url = v;
            }
            if let Some(v) = upstream.api_key.filter(|k| !k.trim().is_empty()) {
                config.upstream.api_key = Some(SecretString::from(v));
            }
            if let Some(v) = upstream.country {
                config.upstream.country = non_empty(v);
            }
            if let Some(v) = upstream.timeout_secs {
                config.upstream.timeout_secs = v;
            }
        }
        if let Some(aggregation) = file.aggregation {
            let target = &mut config.aggregation;
            if let Some(v) = aggregation.default_language {
                target.default_language = v;
            }
            if let Some(v) = aggregation.language_min_articles {
                target.language_min_articles = v;
            }
            if let Some(v) = aggregation.domain_min_articles {
                target.domain_min_articles = v;
            }
            if let Some(v) = aggregation.search_min_articles {
                target.search_min_articles = v;
            }
            if let Some(v) = aggregation.max_attempts {
                target.max_attempts = v;
            }
        }
        if let Some(cache) = file.cache {
            let target = &mut config.cache;
            if let Some(v) = cache.backend {
                target.backend = CacheBackend::parse(&v);
            }
            target.redis_url = cache.redis_url.or(target.redis_url.take());
            if let Some(v) = cache.ttl_secs {
                target.ttl_secs = v;
            }
            if let Some(v) = cache.filter_capacity {
                target.filter_capacity = v;
            }
            if let Some(v) = cache.filter_false_positive_rate {
                target.filter_false_positive_rate = v;
            }
            if let Some(v) = cache.breaker_failure_threshold {
                target.breaker.failure_threshold = v;
            }
            if let Some(v) = cache.breaker_reset_timeout_ms {
                target.breaker.reset_timeout_ms = v;
            }
        }
        if let Some(store) = file.store {
            if let Some(v) = store.backend {
                config.store.backend = StoreBackend::parse(&v);
            }
            if let Some(v) = store.sqlite_path {
                config.store.sqlite_path = PathBuf::from(v);
            }
            if let Some(v) = store.max_merge_retries {
                config.store.max_merge_retries = v;
            }
        }
        if let Some(recommendations) = file.recommendations {
            if let Some(v) = recommendations.max_sources {
                config.recommendations.max_sources = v;
            }
            if let Some(v) = recommendations.max_articles {
                config.recommendations.max_articles = v;
            }
        }
        if let Some(server) = file.server {
            if let Some(v) = server.host {
                config.server.host = v;
            }
            if let Some(v) = server.port {
                config.server.port = v;
            }
            if let Some(v) = server.jwt_secret.filter(|s| !s.is_empty()) {
                config.server.jwt_secret = Some(SecretString::from(v));
            }
            config.server.jwt_issuer = server.jwt_issuer;
            config.server.jwt_audience = server.jwt_audience;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_string("NEWSROOM_API_KEY").or_else(|| env_string("API_KEY")) {
            self.upstream.api_key = Some(SecretString::from(v));
        }
        if let Some(v) = env_string("NEWSROOM_UPSTREAM_URL") {
            self.upstream.base_url = v;
        }
        if let Some(v) = env_string("NEWSROOM_CACHE_BACKEND") {
            self.cache.backend = CacheBackend::parse(&v);
        }
        if let Some(v) = env_string("NEWSROOM_REDIS_URL") {
            self.cache.redis_url = Some(v);
        }
        if let Some(v) = env_string("NEWSROOM_STORE_BACKEND") {
            self.store.backend = StoreBackend::parse(&v);
        }
        if let Some(v) = env_string("NEWSROOM_SQLITE_PATH") {
            self.store.sqlite_path = PathBuf::from(v);
        }
        if let Some(port) = env_string("NEWSROOM_PORT")
            .or_else(|| env_string("PORT"))
            .and_then(|v| v.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Some(v) = env_string("NEWSROOM_JWT_SECRET") {
            self.server.jwt_secret = Some(SecretString::from(v));
        }
        self
    }

    /// Checks that the configuration can produce working services.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        let aggregation = &self.aggregation;
        if aggregation.language_min_articles == 0
            || aggregation.domain_min_articles == 0
            || aggregation.search_min_articles == 0
        {
            return Err(invalid("aggregation minimums must be positive"));
        }
        if aggregation.max_attempts == 0 {
            return Err(invalid("aggregation.max_attempts must be positive"));
        }
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs must be positive"));
        }
        if self.cache.filter_capacity == 0 {
            return Err(invalid("cache.filter_capacity must be positive"));
        }
        let rate = self.cache.filter_false_positive_rate;
        if !(rate > 0.0 && rate < 1.0) {
            return Err(invalid("cache.filter_false_positive_rate must be in (0, 1)"));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            return Err(invalid("cache.redis_url is required for the redis backend"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(invalid("upstream.timeout_secs must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(non_empty)
}
