//! Shared fakes for integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use newsroom::config::NewsroomConfig;
use newsroom::models::{Article, Page, Source};
use newsroom::services::ServiceContainer;
use newsroom::storage::{InMemoryHistoryStore, InMemoryKeyValueStore};
use newsroom::upstream::{LatestQuery, NewsProvider, SourcesQuery};
use newsroom::{Error, HistoryStore, KeyValueStore, Result};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Provider serving scripted pages of articles.
///
/// Page `n` is reachable with token `p{n}`; the first call has no token.
/// Articles are named `{prefix}-{page}-{index}`.
pub struct ScriptedProvider {
    page_size: usize,
    pages: usize,
    sources: Vec<Source>,
    fixed: Option<Vec<Article>>,
    delay: Duration,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
    source_calls: AtomicUsize,
    queries: Mutex<Vec<LatestQuery>>,
}

impl ScriptedProvider {
    /// `pages` pages of `page_size` articles each.
    pub fn paged(page_size: usize, pages: usize) -> Self {
        Self {
            page_size,
            pages,
            sources: Vec::new(),
            fixed: None,
            delay: Duration::ZERO,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
            source_calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// One page holding exactly `articles`.
    pub fn single_page(articles: Vec<Article>) -> Self {
        let mut provider = Self::paged(articles.len(), 1);
        provider.fixed = Some(articles);
        provider
    }

    /// Sets the source list.
    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    /// Sleeps before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fails the `n`th `latest` call (1-based) with an upstream error.
    pub fn failing_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// Number of `latest` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `sources` calls so far.
    pub fn source_calls(&self) -> usize {
        self.source_calls.load(Ordering::SeqCst)
    }

    /// Every `latest` query received.
    pub fn queries(&self) -> Vec<LatestQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn latest(&self, query: &LatestQuery) -> Result<Page<Article>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().unwrap().push(query.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(Error::UpstreamUnavailable {
                operation: "latest".to_string(),
                cause: "scripted failure".to_string(),
            });
        }

        if let Some(articles) = &self.fixed {
            return Ok(Page::new(articles.clone(), None));
        }

        let page: usize = query
            .page
            .as_deref()
            .and_then(|t| t.strip_prefix('p'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(1);
        let prefix = query
            .domain
            .clone()
            .or_else(|| query.language.clone())
            .unwrap_or_else(|| "news".to_string());
        let results = (0..self.page_size)
            .map(|i| Article::new(format!("{prefix}-{page}-{i}")))
            .collect();
        let next = (page < self.pages).then(|| format!("p{}", page + 1));
        Ok(Page::new(results, next))
    }

    async fn sources(&self, _query: &SourcesQuery) -> Result<Vec<Source>> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.sources.clone())
    }
}

/// Key/value store whose every call fails.
#[derive(Debug, Default)]
pub struct FailingKeyValueStore {
    calls: AtomicUsize,
}

impl FailingKeyValueStore {
    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for FailingKeyValueStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::CacheUnavailable {
            operation: "set".to_string(),
            cause: "connection refused".to_string(),
        })
    }

    async fn get(&self, _key: &str) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::CacheUnavailable {
            operation: "get".to_string(),
            cause: "connection refused".to_string(),
        })
    }
}

/// Services over in-memory backends and the given provider.
pub fn services(provider: Arc<ScriptedProvider>) -> ServiceContainer {
    services_with(
        provider,
        Arc::new(InMemoryKeyValueStore::new()),
        Arc::new(InMemoryHistoryStore::new()),
    )
}

/// Services over caller-supplied backends.
pub fn services_with(
    provider: Arc<ScriptedProvider>,
    kv: Arc<dyn KeyValueStore>,
    store: Arc<dyn HistoryStore>,
) -> ServiceContainer {
    ServiceContainer::with_backends(&NewsroomConfig::default(), provider, kv, store)
        .expect("default config is valid")
}

/// A source that passes the presentable filter.
pub fn presentable_source(id: &str) -> Source {
    Source::new(id)
        .with_url(format!("https://{id}.example"))
        .with_description(format!("{id} news"))
}
