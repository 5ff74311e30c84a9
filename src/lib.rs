//! # Newsroom
//!
//! Cache-backed news aggregation and personalized recommendations.
//!
//! Newsroom sits in front of a rate-limited, paginated news provider. It
//! assembles large result sets out of small provider pages, caches them
//! behind a probabilistic existence check, keeps a de-duplicated history of
//! what each user saved, and ranks fresh articles against that history.
//!
//! ## Features
//!
//! - Existence-gated cache: Bloom filter in front of a TTL key/value store
//! - Threshold fetching across provider pages with bounded attempts
//! - Single-flight cache misses and per-user serialized history merges
//! - Pluggable backends (in-memory, Redis, `SQLite`)
//! - Optional axum HTTP surface with JWT authentication
//!
//! ## Example
//!
//! ```rust,ignore
//! use newsroom::{NewsroomConfig, services::ServiceContainer};
//!
//! let config = NewsroomConfig::load_default();
//! let services = ServiceContainer::from_config(&config).await?;
//! let latest = services.aggregation().latest_by_language("en").await?;
//! println!("{} articles", latest.total_results);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cache;
pub mod config;
#[cfg(feature = "http")]
pub mod http;
pub mod locks;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod upstream;

// Re-exports for convenience
pub use cache::{CacheKey, ExistenceGatedCache, MembershipFilter};
pub use config::NewsroomConfig;
pub use models::{
    Article, InterestProfile, MergeResult, MergeStatus, Page, Recommendations, ResultSet,
    SaveRequest, Source, UserHistory, UserId,
};
pub use services::{AggregationService, HistoryService, Recommender, SearchFilters, ServiceContainer};
pub use storage::{HistoryStore, KeyValueStore, WriteOutcome};
pub use upstream::{NewsProvider, ThresholdFetcher};

/// Error type for newsroom operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed user id, empty save request, empty search term |
/// | `NotFound` | No saved history exists for the requested user |
/// | `UpstreamUnavailable` | The news provider failed, timed out or returned an error payload |
/// | `CacheUnavailable` | The durable cache store is unreachable (callers fail open) |
/// | `StoreWriteFailure` | The history document store failed or kept conflicting |
/// | `OperationFailed` | Serialization, runtime or configuration I/O failures |
/// | `Unauthorized` | Missing or invalid bearer token on the HTTP surface |
/// | `FeatureNotEnabled` | A configured backend was not compiled in |
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The user identifier is empty or contains unsupported characters
    /// - A save request carries neither articles nor sources
    /// - An article or source has an empty identifier
    /// - A search term is blank
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested record does not exist.
    ///
    /// Distinct from an existing but empty history.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream news provider could not serve the request.
    ///
    /// Partial pages gathered before the failure are discarded.
    #[error("upstream '{operation}' unavailable: {cause}")]
    UpstreamUnavailable {
        /// The provider operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The durable cache store could not be reached.
    ///
    /// Aggregation treats this as a cache miss and fetches from upstream.
    #[error("cache '{operation}' unavailable: {cause}")]
    CacheUnavailable {
        /// The cache operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The history document store rejected or failed a read or write.
    ///
    /// Merges are idempotent, so callers may resubmit.
    #[error("store '{operation}' failed: {cause}")]
    StoreWriteFailure {
        /// The store operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - JSON serialization of a cache payload fails
    /// - A configuration file cannot be read or parsed
    /// - A blocking task panics or the runtime cannot be created
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Authentication failed.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::CacheUnavailable { .. } => "cache_unavailable",
            Self::StoreWriteFailure { .. } => "store_write_failure",
            Self::OperationFailed { .. } => "operation_failed",
            Self::Unauthorized(_) => "unauthorized",
            Self::FeatureNotEnabled(_) => "feature_not_enabled",
        }
    }

    pub(crate) fn upstream(operation: &str, cause: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn cache(operation: &str, cause: impl ToString) -> Self {
        Self::CacheUnavailable {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn store(operation: &str, cause: impl ToString) -> Self {
        Self::StoreWriteFailure {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }

    pub(crate) fn failed(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for newsroom operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use newsroom::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
