//! Existence-gated response cache.
//!
//! Reads go through a [`MembershipFilter`] first. A key the filter has never
//! seen is answered as absent without a store round trip; a key it reports as
//! present is looked up in the durable [`KeyValueStore`], which remains the
//! only source of data. Filter false positives therefore cost one extra
//! lookup and never serve wrong data.
//!
//! Writes go to the store first and to the filter only once the store has
//! accepted them, so the filter never claims a key whose value is not yet
//! readable.

mod filter;
mod key;

pub use filter::MembershipFilter;
pub use key::CacheKey;

use crate::storage::KeyValueStore;
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Default entry lifetime (30 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Two-tier cache: membership filter in front of a TTL key/value store.
pub struct ExistenceGatedCache {
    store: Arc<dyn KeyValueStore>,
    filter: RwLock<MembershipFilter>,
    ttl: Duration,
}

impl std::fmt::Debug for ExistenceGatedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExistenceGatedCache")
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ExistenceGatedCache {
    /// Creates a cache over `store` with the given filter and entry lifetime.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, filter: MembershipFilter, ttl: Duration) -> Self {
        Self {
            store,
            filter: RwLock::new(filter),
            ttl,
        }
    }

    /// Entry lifetime applied on every write.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns `true` if the filter reports `key` as possibly written.
    #[must_use]
    pub fn might_contain(&self, key: &CacheKey) -> bool {
        self.filter_read().contains(key.as_str())
    }

    /// Serializes `value` and stores it under `key` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if `value` cannot be serialized, or
    /// [`Error::CacheUnavailable`] if the store rejects the write. The filter
    /// is left untouched on failure.
    pub async fn put<T: Serialize + Sync>(&self, key: &CacheKey, value: &T) -> Result<()> {
        let payload = serde_json::to_string(value).map_err(|e| Error::failed("cache_encode", e))?;

        let written = self
            .store
            .set_with_ttl(key.as_str(), payload, self.ttl)
            .await;
        if let Err(e) = written {
            metrics::counter!("newsroom_cache_writes_total", "outcome" => "error").increment(1);
            return Err(e);
        }

        self.filter_write().insert(key.as_str());
        metrics::counter!("newsroom_cache_writes_total", "outcome" => "stored").increment(1);
        tracing::debug!(cache_key = %key, ttl_secs = self.ttl.as_secs(), "cached");
        Ok(())
    }

    /// Looks `key` up.
    ///
    /// Returns `Ok(None)` when the filter rules the key out, when the store
    /// no longer holds it, or when the stored payload no longer decodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheUnavailable`] if the store cannot be reached.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>> {
        if !self.might_contain(key) {
            metrics::counter!("newsroom_cache_lookups_total", "result" => "filtered").increment(1);
            tracing::trace!(cache_key = %key, "filter miss");
            return Ok(None);
        }

        let payload = match self.store.get(key.as_str()).await {
            Ok(payload) => payload,
            Err(e) => {
                metrics::counter!("newsroom_cache_lookups_total", "result" => "error")
                    .increment(1);
                return Err(e);
            },
        };

        let Some(payload) = payload else {
            metrics::counter!("newsroom_cache_lookups_total", "result" => "miss").increment(1);
            tracing::debug!(cache_key = %key, "cache miss");
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(value) => {
                metrics::counter!("newsroom_cache_lookups_total", "result" => "hit").increment(1);
                tracing::debug!(cache_key = %key, "cache hit");
                Ok(Some(value))
            },
            Err(e) => {
                metrics::counter!("newsroom_cache_lookups_total", "result" => "miss").increment(1);
                tracing::warn!(cache_key = %key, error = %e, "discarding undecodable cache entry");
                Ok(None)
            },
        }
    }

    fn filter_read(&self) -> RwLockReadGuard<'_, MembershipFilter> {
        self.filter
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn filter_write(&self) -> RwLockWriteGuard<'_, MembershipFilter> {
        self.filter
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
