//! News aggregation service.
//!
//! Language, domain and source lookups are cached; searches and "load more"
//! pages always go to the provider. Concurrent misses for the same cache key
//! share one upstream fetch: the first caller fetches while later callers
//! wait for its outcome, which reaches them even when the cache is down or
//! the fetch fails.

use crate::cache::{CacheKey, ExistenceGatedCache};
use crate::config::AggregationConfig;
use crate::locks::{Flight, FlightOutcome, SingleFlight};
use crate::models::{Article, ResultSet, Source};
use crate::upstream::{FetchPlan, LatestQuery, NewsProvider, SourcesQuery, ThresholdFetcher};
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Optional search filters forwarded to the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Language code.
    pub language: Option<String>,
    /// Category.
    pub category: Option<String>,
}

/// Serves result sets by language, domain and search term.
pub struct AggregationService {
    cache: Arc<ExistenceGatedCache>,
    provider: Arc<dyn NewsProvider>,
    fetcher: ThresholdFetcher,
    config: AggregationConfig,
    inflight: SingleFlight,
}

impl std::fmt::Debug for AggregationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregationService")
            .field("cache", &self.cache)
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AggregationService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        cache: Arc<ExistenceGatedCache>,
        provider: Arc<dyn NewsProvider>,
        config: AggregationConfig,
    ) -> Self {
        Self {
            fetcher: ThresholdFetcher::new(Arc::clone(&provider)),
            cache,
            provider,
            config,
            inflight: SingleFlight::new(),
        }
    }

    /// Language used when callers do not name one.
    #[must_use]
    pub fn default_language(&self) -> &str {
        &self.config.default_language
    }

    /// Latest articles in `language`, at least the language minimum when the
    /// provider has that many.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank language or
    /// [`Error::UpstreamUnavailable`] if a miss cannot be filled.
    #[instrument(skip(self))]
    pub async fn latest_by_language(&self, language: &str) -> Result<ResultSet<Article>> {
        let language = dimension("language", language)?;
        let key = CacheKey::latest_by_language(&language);
        let plan = FetchPlan::language(&self.config);
        let query = LatestQuery::language(language);

        self.cached(&key, || async {
            self.fetcher
                .fetch_at_least(plan, &query)
                .await
                .map(ResultSet::from)
        })
        .await
    }

    /// Latest articles from `domain`, at least the domain minimum when the
    /// provider has that many.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank domain or
    /// [`Error::UpstreamUnavailable`] if a miss cannot be filled.
    #[instrument(skip(self))]
    pub async fn latest_by_domain(&self, domain: &str) -> Result<ResultSet<Article>> {
        let domain = dimension("domain", domain)?;
        let key = CacheKey::latest_by_domain(&domain);
        let plan = FetchPlan::domain(&self.config);
        let query = LatestQuery::domain(domain);

        self.cached(&key, || async {
            self.fetcher
                .fetch_at_least(plan, &query)
                .await
                .map(ResultSet::from)
        })
        .await
    }

    /// One uncached page for `domain`, continuing from `page`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank domain or token, or
    /// [`Error::UpstreamUnavailable`].
    #[instrument(skip(self))]
    pub async fn domain_page(&self, domain: &str, page: &str) -> Result<ResultSet<Article>> {
        let domain = dimension("domain", domain)?;
        let token = required("page", page)?;
        let query = LatestQuery::domain(domain).with_page(Some(token));
        self.provider.latest(&query).await.map(ResultSet::from)
    }

    /// Live search on article titles, at least the search minimum when the
    /// provider has that many.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank term or
    /// [`Error::UpstreamUnavailable`].
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str, filters: SearchFilters) -> Result<ResultSet<Article>> {
        let term = required("search term", term)?;
        let query = LatestQuery::search(term)
            .with_language(filters.language.filter(|v| !v.trim().is_empty()))
            .with_category(filters.category.filter(|v| !v.trim().is_empty()));

        self.fetcher
            .fetch_at_least(FetchPlan::search(&self.config), &query)
            .await
            .map(ResultSet::from)
    }

    /// One uncached search page continuing from `page`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank term or token, or
    /// [`Error::UpstreamUnavailable`].
    #[instrument(skip(self))]
    pub async fn search_page(&self, term: &str, page: &str) -> Result<ResultSet<Article>> {
        let term = required("search term", term)?;
        let token = required("page", page)?;
        let query = LatestQuery::search(term).with_page(Some(token));
        self.provider.latest(&query).await.map(ResultSet::from)
    }

    /// Sources publishing in `language`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a blank language or
    /// [`Error::UpstreamUnavailable`] if a miss cannot be filled.
    #[instrument(skip(self))]
    pub async fn sources(&self, language: &str) -> Result<Vec<Source>> {
        let language = dimension("language", language)?;
        let key = CacheKey::sources(&language);
        let query = SourcesQuery::language(language);

        self.cached(&key, || async { self.provider.sources(&query).await })
            .await
    }

    /// Serves `key` from the cache, or runs `fetch` once per key and caches
    /// its result.
    async fn cached<T, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        loop {
            let leader = match self.inflight.join(key.as_str()) {
                Flight::Leader(leader) => leader,
                Flight::Follower(follower) => {
                    if let Some(outcome) = follower.outcome().await {
                        tracing::debug!(cache_key = %key, "filled by concurrent fetch");
                        metrics::counter!("newsroom_cache_coalesced_total").increment(1);
                        return decode(outcome);
                    }
                    // The leader was cancelled; take over the key.
                    continue;
                },
            };

            // A flight that ended between the lookup and the join has cached
            // its result already.
            if let Some(hit) = self.lookup(key).await {
                leader.publish(encode(&hit));
                return Ok(hit);
            }

            let fresh = fetch().await;
            match &fresh {
                Ok(value) => {
                    leader.publish(encode(value));
                    if let Err(e) = self.cache.put(key, value).await {
                        tracing::warn!(
                            cache_key = %key,
                            error = %e,
                            "cache write failed, serving uncached"
                        );
                    }
                },
                Err(e) => leader.publish(Err(e.clone())),
            }
            return fresh;
        }
    }

    /// Cache read that degrades every failure to a miss.
    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "cache unavailable, treating as miss");
                None
            },
        }
    }
}

fn encode<T: Serialize>(value: &T) -> FlightOutcome {
    serde_json::to_string(value)
        .map(Arc::from)
        .map_err(|e| Error::failed("encode shared result", e))
}

fn decode<T: DeserializeOwned>(outcome: FlightOutcome) -> Result<T> {
    serde_json::from_str(&outcome?).map_err(|e| Error::failed("decode shared result", e))
}

/// Normalizes a cacheable dimension.
fn dimension(name: &str, value: &str) -> Result<String> {
    required(name, value).map(|v| v.to_lowercase())
}

fn required(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{name} is required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_TTL, MembershipFilter};
    use crate::models::Page;
    use crate::storage::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        queries: Mutex<Vec<LatestQuery>>,
    }

    #[async_trait]
    impl NewsProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn latest(&self, query: &LatestQuery) -> Result<Page<Article>> {
            self.queries.lock().expect("lock").push(query.clone());
            Ok(Page::new(vec![Article::new("a1")], None))
        }

        async fn sources(&self, _query: &SourcesQuery) -> Result<Vec<Source>> {
            Ok(vec![Source::new("bbc")])
        }
    }

    fn service(provider: Arc<RecordingProvider>) -> AggregationService {
        let filter = MembershipFilter::with_rate(100, 0.01).expect("valid sizing");
        let cache = ExistenceGatedCache::new(
            Arc::new(InMemoryKeyValueStore::new()),
            filter,
            DEFAULT_TTL,
        );
        AggregationService::new(Arc::new(cache), provider, AggregationConfig::default())
    }

    #[tokio::test]
    async fn test_blank_dimensions_are_rejected() {
        let svc = service(Arc::new(RecordingProvider::default()));
        assert!(matches!(
            svc.latest_by_language("  ").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            svc.search("", SearchFilters::default()).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            svc.domain_page("bbc", " ").await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_search_forwards_filters() {
        let provider = Arc::new(RecordingProvider::default());
        let svc = service(Arc::clone(&provider));
        let filters = SearchFilters {
            language: Some("en".to_string()),
            category: Some(String::new()),
        };
        svc.search(" election ", filters).await.expect("search");

        let queries = provider.queries.lock().expect("lock").clone();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].title_query.as_deref(), Some("election"));
        assert_eq!(queries[0].language.as_deref(), Some("en"));
        assert_eq!(queries[0].category, None);
    }

    #[tokio::test]
    async fn test_language_is_normalized_for_key_and_query() {
        let provider = Arc::new(RecordingProvider::default());
        let svc = service(Arc::clone(&provider));
        svc.latest_by_language(" EN").await.expect("first");
        svc.latest_by_language("en").await.expect("second");

        let queries = provider.queries.lock().expect("lock").clone();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].language.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn test_next_page_is_uncached() {
        let provider = Arc::new(RecordingProvider::default());
        let svc = service(Arc::clone(&provider));
        svc.search_page("rust", "tok").await.expect("first");
        svc.search_page("rust", "tok").await.expect("second");

        let queries = provider.queries.lock().expect("lock").clone();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].page.as_deref(), Some("tok"));
    }
}
