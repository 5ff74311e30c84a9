//! Upstream news provider access.
//!
//! [`NewsProvider`] is the seam between the engine and the paginated
//! third-party API. [`NewsDataClient`] talks to the real provider;
//! [`ThresholdFetcher`] turns one-page calls into result sets of a minimum
//! size.

mod fetcher;
mod newsdata;

pub use fetcher::{FetchOutcome, FetchPlan, ThresholdFetcher};
pub use newsdata::NewsDataClient;

use crate::Result;
use crate::models::{Article, Page, Source};
use async_trait::async_trait;

/// Filters for one page of latest articles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestQuery {
    /// Language code.
    pub language: Option<String>,
    /// Source domain.
    pub domain: Option<String>,
    /// Words that must appear in the title.
    pub title_query: Option<String>,
    /// Category filter.
    pub category: Option<String>,
    /// Continuation token from a previous page.
    pub page: Option<String>,
}

impl LatestQuery {
    /// Latest articles in a language.
    #[must_use]
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::default()
        }
    }

    /// Latest articles from a domain.
    #[must_use]
    pub fn domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::default()
        }
    }

    /// Latest articles whose title matches `term`.
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            title_query: Some(term.into()),
            ..Self::default()
        }
    }

    /// Restricts results to a language.
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Restricts results to a category.
    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Continues from a page token.
    #[must_use]
    pub fn with_page(mut self, page: Option<String>) -> Self {
        self.page = page;
        self
    }
}

/// Filters for the source list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcesQuery {
    /// Language code.
    pub language: Option<String>,
}

impl SourcesQuery {
    /// Sources publishing in `language`.
    #[must_use]
    pub fn language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
        }
    }
}

/// A paginated news provider.
///
/// Every failure is reported as [`crate::Error::UpstreamUnavailable`].
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Provider name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Fetches one page of latest articles.
    async fn latest(&self, query: &LatestQuery) -> Result<Page<Article>>;

    /// Fetches the source list.
    async fn sources(&self, query: &SourcesQuery) -> Result<Vec<Source>>;
}
