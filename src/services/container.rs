//! Service wiring.

use super::{AggregationService, HistoryService, Recommender};
use crate::cache::{ExistenceGatedCache, MembershipFilter};
use crate::config::{CacheBackend, NewsroomConfig, StoreBackend};
use crate::storage::{
    HistoryStore, InMemoryHistoryStore, InMemoryKeyValueStore, KeyValueStore, RedisKeyValueStore,
    ResilientKeyValueStore, SqliteHistoryStore,
};
use crate::upstream::{NewsDataClient, NewsProvider};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Owns every service and the backends they share.
#[derive(Debug, Clone)]
pub struct ServiceContainer {
    aggregation: Arc<AggregationService>,
    history: Arc<HistoryService>,
    recommender: Arc<Recommender>,
}

impl ServiceContainer {
    /// Builds backends and services from configuration.
    ///
    /// An unreachable Redis at startup downgrades the cache to process
    /// memory rather than failing; the cache only ever saves upstream calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for invalid configuration,
    /// [`Error::FeatureNotEnabled`] if a configured backend is not compiled
    /// in, or [`Error::StoreWriteFailure`] if the history store cannot open.
    pub async fn from_config(config: &NewsroomConfig) -> Result<Self> {
        config.validate()?;

        let provider: Arc<dyn NewsProvider> = Arc::new(NewsDataClient::from_config(&config.upstream)?);
        let kv = Self::build_kv_store(config).await?;
        let store = Self::build_history_store(config)?;

        tracing::info!(
            cache = kv.name(),
            store = store.name(),
            provider = provider.name(),
            "services configured"
        );
        Self::with_backends(config, provider, kv, store)
    }

    /// Builds services over caller-supplied backends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the filter sizing is invalid.
    pub fn with_backends(
        config: &NewsroomConfig,
        provider: Arc<dyn NewsProvider>,
        kv: Arc<dyn KeyValueStore>,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self> {
        let filter = MembershipFilter::with_rate(
            config.cache.filter_capacity,
            config.cache.filter_false_positive_rate,
        )?;
        let cache = Arc::new(ExistenceGatedCache::new(
            kv,
            filter,
            Duration::from_secs(config.cache.ttl_secs),
        ));

        let aggregation = Arc::new(AggregationService::new(
            cache,
            provider,
            config.aggregation.clone(),
        ));
        let history = Arc::new(
            HistoryService::new(store).with_max_retries(config.store.max_merge_retries),
        );
        let recommender = Arc::new(Recommender::new(
            Arc::clone(&aggregation),
            Arc::clone(&history),
            config.recommendations,
        ));

        Ok(Self {
            aggregation,
            history,
            recommender,
        })
    }

    /// Aggregation service.
    #[must_use]
    pub fn aggregation(&self) -> &AggregationService {
        &self.aggregation
    }

    /// History service.
    #[must_use]
    pub fn history(&self) -> &HistoryService {
        &self.history
    }

    /// Recommender.
    #[must_use]
    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    async fn build_kv_store(config: &NewsroomConfig) -> Result<Arc<dyn KeyValueStore>> {
        match config.cache.backend {
            CacheBackend::Memory => Ok(Arc::new(InMemoryKeyValueStore::new())),
            CacheBackend::Redis => {
                let url = config.cache.redis_url.as_deref().ok_or_else(|| {
                    Error::InvalidInput("cache.redis_url is required".to_string())
                })?;
                match RedisKeyValueStore::connect(url).await {
                    Ok(redis) => Ok(Arc::new(ResilientKeyValueStore::new(
                        redis,
                        &config.cache.breaker,
                    ))),
                    Err(e @ Error::FeatureNotEnabled(_)) => Err(e),
                    Err(e) => {
                        tracing::error!(error = %e, "redis unreachable, caching in memory");
                        Ok(Arc::new(InMemoryKeyValueStore::new()))
                    },
                }
            },
        }
    }

    fn build_history_store(config: &NewsroomConfig) -> Result<Arc<dyn HistoryStore>> {
        match config.store.backend {
            StoreBackend::Memory => Ok(Arc::new(InMemoryHistoryStore::new())),
            StoreBackend::Sqlite => Ok(Arc::new(SqliteHistoryStore::open(
                &config.store.sqlite_path,
            )?)),
        }
    }
}
