//! Pagination until a minimum result count.

use super::{LatestQuery, NewsProvider};
use crate::Result;
use crate::config::AggregationConfig;
use crate::models::{Article, ResultSet};
use std::collections::HashSet;
use std::sync::Arc;

/// Stop conditions for one threshold fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPlan {
    /// Stop once this many results are gathered.
    pub min_results: usize,
    /// Stop after this many pages; `None` relies on the provider running out.
    pub max_attempts: Option<u32>,
}

impl FetchPlan {
    /// Creates a plan.
    #[must_use]
    pub const fn new(min_results: usize, max_attempts: Option<u32>) -> Self {
        Self {
            min_results,
            max_attempts,
        }
    }

    /// Plan for language-scoped fetches.
    #[must_use]
    pub const fn language(config: &AggregationConfig) -> Self {
        Self::new(config.language_min_articles, Some(config.max_attempts))
    }

    /// Plan for domain-scoped fetches.
    #[must_use]
    pub const fn domain(config: &AggregationConfig) -> Self {
        Self::new(config.domain_min_articles, Some(config.max_attempts))
    }

    /// Plan for searches, bounded only by the provider's pages.
    #[must_use]
    pub const fn search(config: &AggregationConfig) -> Self {
        Self::new(config.search_min_articles, None)
    }
}

/// What a threshold fetch gathered.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Every page's results, in order.
    pub results: Vec<Article>,
    /// Last token the provider returned.
    pub next_page: Option<String>,
    /// Provider calls made.
    pub pages: u32,
}

impl From<FetchOutcome> for ResultSet<Article> {
    fn from(outcome: FetchOutcome) -> Self {
        Self::new(outcome.results, outcome.next_page)
    }
}

/// Pages a provider until a plan is satisfied.
#[derive(Clone)]
pub struct ThresholdFetcher {
    provider: Arc<dyn NewsProvider>,
}

impl std::fmt::Debug for ThresholdFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThresholdFetcher")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl ThresholdFetcher {
    /// Creates a fetcher over `provider`.
    #[must_use]
    pub fn new(provider: Arc<dyn NewsProvider>) -> Self {
        Self { provider }
    }

    /// Requests pages for `query` until `plan` is met.
    ///
    /// The loop stops, in order of precedence, when enough results have been
    /// gathered, when the provider returns no further token, or when the page
    /// ceiling is reached. A token the provider already handed out also ends
    /// the loop, so a misbehaving provider cannot keep an unbounded search
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UpstreamUnavailable`] from the first failing
    /// page. Results gathered before the failure are discarded.
    #[tracing::instrument(skip(self, query), fields(provider = self.provider.name(), min = plan.min_results))]
    pub async fn fetch_at_least(&self, plan: FetchPlan, query: &LatestQuery) -> Result<FetchOutcome> {
        let mut results: Vec<Article> = Vec::new();
        let mut token = query.page.clone();
        let mut seen: HashSet<String> = token.iter().cloned().collect();
        let mut pages: u32 = 0;

        loop {
            if results.len() >= plan.min_results {
                break;
            }
            if let Some(max) = plan.max_attempts
                && pages >= max
            {
                tracing::debug!(pages, gathered = results.len(), "page ceiling reached");
                break;
            }

            let page = self
                .provider
                .latest(&query.clone().with_page(token.clone()))
                .await?;
            pages += 1;
            results.extend(page.results);
            token = page.next_page;
            tracing::trace!(pages, gathered = results.len(), "page fetched");

            match &token {
                None => break,
                Some(next) if !seen.insert(next.clone()) => {
                    tracing::warn!(pages, "provider repeated a page token, stopping");
                    break;
                },
                Some(_) => {},
            }
        }

        metrics::histogram!("newsroom_threshold_fetch_pages").record(f64::from(pages));
        tracing::debug!(pages, gathered = results.len(), "threshold fetch complete");

        Ok(FetchOutcome {
            results,
            next_page: token,
            pages,
        })
    }
}
