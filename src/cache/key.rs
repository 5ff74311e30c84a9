//! Cache keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic key for one cacheable logical query.
///
/// Dimensions are trimmed and lower-cased, so `" EN"` and `"en"` address the
/// same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for the latest articles in a language.
    #[must_use]
    pub fn latest_by_language(language: &str) -> Self {
        Self::compose(&["latestNews", "language"], language)
    }

    /// Key for the latest articles from a domain.
    #[must_use]
    pub fn latest_by_domain(domain: &str) -> Self {
        Self::compose(&["latestNews", "domain"], domain)
    }

    /// Key for the source list of a language.
    #[must_use]
    pub fn sources(language: &str) -> Self {
        Self::compose(&["sources"], language)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn compose(namespace: &[&str], dimension: &str) -> Self {
        let mut key = namespace.join(":");
        key.push(':');
        key.push_str(&dimension.trim().to_lowercase());
        Self(key)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
