//! Personalized recommendations.

use super::{AggregationService, HistoryService};
use crate::config::RecommendationConfig;
use crate::models::{
    Article, Identified, InterestProfile, RecommendationMode, Recommendations, Source, UserId,
};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// Ranks fresh articles and sources against a user's saved history.
#[derive(Debug)]
pub struct Recommender {
    aggregation: Arc<AggregationService>,
    history: Arc<HistoryService>,
    config: RecommendationConfig,
}

impl Recommender {
    /// Creates the recommender.
    #[must_use]
    pub fn new(
        aggregation: Arc<AggregationService>,
        history: Arc<HistoryService>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            aggregation,
            history,
            config,
        }
    }

    /// Recommends sources, publishers and articles for `user_id`.
    ///
    /// Sources and latest articles come from the aggregation service in the
    /// default language. Users without saved history get the latest articles
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Propagates upstream and store failures.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn recommend(&self, user_id: &UserId) -> Result<Recommendations> {
        let language = self.aggregation.default_language();
        let (sources, latest, history) = tokio::try_join!(
            self.aggregation.sources(language),
            self.aggregation.latest_by_language(language),
            self.history.find(user_id),
        )?;

        let recommended_sources = presentable_sources(sources, self.config.max_sources);
        let profile = history
            .filter(|h| !h.is_empty())
            .map(|h| h.interest_profile());

        let (recommended_articles, mode) = match profile {
            None => {
                let mut articles = latest.results;
                articles.truncate(self.config.max_articles);
                (articles, RecommendationMode::ColdStart)
            },
            Some(profile) => (
                rank_articles(&profile, latest.results, self.config.max_articles),
                RecommendationMode::Personalized,
            ),
        };

        metrics::counter!("newsroom_recommendations_total", "mode" => mode.as_str()).increment(1);
        tracing::debug!(
            mode = mode.as_str(),
            articles = recommended_articles.len(),
            sources = recommended_sources.len(),
            "recommendations built"
        );

        Ok(Recommendations {
            suggested_publishers: recommended_sources.clone(),
            recommended_sources,
            recommended_articles,
            mode,
        })
    }
}

/// First `limit` sources with both a url and a description, provider order.
#[must_use]
pub fn presentable_sources(sources: Vec<Source>, limit: usize) -> Vec<Source> {
    sources
        .into_iter()
        .filter(Source::is_presentable)
        .take(limit)
        .collect()
}

/// Matching articles first, then padding from the rest, `limit` in total.
///
/// Both segments keep provider order, and no article id appears twice.
#[must_use]
pub fn rank_articles(profile: &InterestProfile, latest: Vec<Article>, limit: usize) -> Vec<Article> {
    let mut seen: HashSet<String> = HashSet::new();
    let (matched, rest): (Vec<Article>, Vec<Article>) =
        latest.into_iter().partition(|a| profile.matches(a));

    let mut ranked = Vec::with_capacity(limit);
    for article in matched.into_iter().chain(rest) {
        if ranked.len() >= limit {
            break;
        }
        if seen.insert(article.identifier().to_string()) {
            ranked.push(article);
        }
    }
    ranked
}
