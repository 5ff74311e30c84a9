//! Recommendation integration tests.
//!
//! Runs the recommender end to end over a scripted provider:
//! - Cold start returns the latest articles verbatim
//! - Interest matches are ranked ahead of padding
//! - Source lists are filtered and capped

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{ScriptedProvider, presentable_source, services};
use newsroom::models::{Article, RecommendationMode, SaveRequest, Source, UserId};
use std::collections::HashSet;
use std::sync::Arc;

fn user(raw: &str) -> UserId {
    UserId::parse(raw).expect("valid user id")
}

/// Twenty latest articles; `x4`, `x9` and `x15` mention the election.
fn latest_with_election_news() -> Vec<Article> {
    (0..20)
        .map(|i| {
            let article = Article::new(format!("x{i}"));
            if [4, 9, 15].contains(&i) {
                article.with_keywords(["election"])
            } else {
                article.with_keywords(["weather"])
            }
        })
        .collect()
}

fn sources() -> Vec<Source> {
    let mut sources: Vec<Source> = (0..8).map(|i| presentable_source(&format!("s{i}"))).collect();
    sources.insert(1, Source::new("no-url").with_description("missing url"));
    sources.insert(3, Source::new("no-description").with_url("https://x.example"));
    sources
}

#[tokio::test]
async fn test_cold_start_returns_latest_verbatim() {
    let provider = Arc::new(
        ScriptedProvider::single_page(latest_with_election_news()).with_sources(sources()),
    );
    let services = services(Arc::clone(&provider));

    let recs = services
        .recommender()
        .recommend(&user("fresh"))
        .await
        .expect("recommend");

    assert_eq!(recs.mode, RecommendationMode::ColdStart);
    let ids: Vec<_> = recs
        .recommended_articles
        .iter()
        .map(|a| a.article_id.as_str())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("x{i}")).collect();
    assert_eq!(ids, expected);

    assert!(recs.recommended_sources.len() <= 6);
    assert_eq!(recs.recommended_sources.len(), 6);
    assert!(recs.recommended_sources.iter().all(Source::is_presentable));
    assert_eq!(recs.recommended_sources, recs.suggested_publishers);
}

#[tokio::test]
async fn test_interest_matches_come_first() {
    let provider = Arc::new(
        ScriptedProvider::single_page(latest_with_election_news()).with_sources(sources()),
    );
    let services = services(Arc::clone(&provider));
    let u1 = user("u1");

    services
        .history()
        .save_news(
            &u1,
            SaveRequest::articles(vec![Article::new("old").with_keywords(["election"])]),
        )
        .await
        .expect("save");

    let recs = services.recommender().recommend(&u1).await.expect("recommend");

    assert_eq!(recs.mode, RecommendationMode::Personalized);
    let ids: Vec<_> = recs
        .recommended_articles
        .iter()
        .map(|a| a.article_id.as_str())
        .collect();
    assert_eq!(ids.len(), 10);
    assert_eq!(&ids[..3], &["x4", "x9", "x15"]);
    assert_eq!(&ids[3..], &["x0", "x1", "x2", "x3", "x5", "x6", "x7"]);

    let unique: HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test]
async fn test_recommendations_reuse_cached_aggregation() {
    let provider = Arc::new(
        ScriptedProvider::single_page(latest_with_election_news()).with_sources(sources()),
    );
    let services = services(Arc::clone(&provider));

    services.recommender().recommend(&user("a")).await.expect("first");
    services.recommender().recommend(&user("b")).await.expect("second");

    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.source_calls(), 1);
}

#[tokio::test]
async fn test_history_without_articles_pads_with_latest() {
    let provider = Arc::new(ScriptedProvider::single_page(latest_with_election_news()));
    let services = services(Arc::clone(&provider));
    let u1 = user("u1");

    // A saved source without articles yields no interests.
    services
        .history()
        .save_news(&u1, SaveRequest::sources(vec![Source::new("bbc")]))
        .await
        .expect("save");

    let recs = services.recommender().recommend(&u1).await.expect("recommend");
    assert_eq!(recs.mode, RecommendationMode::Personalized);
    let ids: Vec<_> = recs
        .recommended_articles
        .iter()
        .map(|a| a.article_id.clone())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("x{i}")).collect();
    assert_eq!(ids, expected);
    assert!(recs.recommended_sources.is_empty());
}
