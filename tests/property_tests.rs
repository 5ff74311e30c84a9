//! Property-based tests.
//!
//! Uses proptest to verify invariants across random inputs:
//! - The membership filter never reports a false negative
//! - History merges are idempotent and never duplicate identifiers
//! - The threshold loop terminates within its bounds
//! - Cache keys are insensitive to case and surrounding whitespace

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::ScriptedProvider;
use newsroom::models::{Article, Source, UserHistory, UserId};
use newsroom::upstream::{FetchPlan, LatestQuery, ThresholdFetcher};
use newsroom::{CacheKey, MembershipFilter};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn articles(ids: &[String]) -> Vec<Article> {
    ids.iter().map(Article::new).collect()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    /// Property: every inserted key is reported as possibly present.
    #[test]
    fn prop_filter_has_no_false_negatives(
        keys in prop::collection::vec("[a-z:]{1,40}", 1..300)
    ) {
        let mut filter = MembershipFilter::with_rate(1000, 0.01).unwrap();
        for key in &keys {
            filter.insert(key);
        }
        for key in &keys {
            prop_assert!(filter.contains(key));
        }
    }

    /// Property: merging the same batch twice changes nothing the second time.
    #[test]
    fn prop_merge_is_idempotent(
        initial in prop::collection::vec("[a-f0-9]{1,4}", 0..20),
        batch in prop::collection::vec("[a-f0-9]{1,4}", 0..20),
    ) {
        let user = UserId::parse("u1").unwrap();
        let mut history = UserHistory::from_submission(user, articles(&initial), vec![]);

        history.merge(articles(&batch), vec![]);
        let once = history.clone();
        let added = history.merge(articles(&batch), vec![Source::new("s")]);

        prop_assert_eq!(added.0, 0);
        prop_assert_eq!(&history.articles, &once.articles);
    }

    /// Property: a history never holds two items with one identifier, and
    /// keeps every identifier ever submitted.
    #[test]
    fn prop_merge_keeps_identifiers_unique(
        batches in prop::collection::vec(prop::collection::vec("[a-c]{1,2}", 0..10), 1..6)
    ) {
        let user = UserId::parse("u1").unwrap();
        let mut history = UserHistory::new(user);
        let mut submitted = HashSet::new();

        for batch in &batches {
            submitted.extend(batch.iter().cloned());
            history.merge(articles(batch), vec![]);
        }

        let ids: Vec<_> = history.articles.iter().map(|a| a.article_id.clone()).collect();
        let unique: HashSet<_> = ids.iter().cloned().collect();
        prop_assert_eq!(ids.len(), unique.len());
        prop_assert_eq!(unique, submitted);
    }

    /// Property: the fetch loop stops at the first of minimum reached,
    /// attempt ceiling hit, or provider exhausted.
    #[test]
    fn prop_threshold_loop_terminates_within_bounds(
        page_size in 0usize..12,
        pages in 1usize..30,
        min_results in 1usize..100,
        ceiling in 1u32..20,
    ) {
        let provider = Arc::new(ScriptedProvider::paged(page_size, pages));
        let fetcher = ThresholdFetcher::new(provider.clone());
        let plan = FetchPlan::new(min_results, Some(ceiling));

        let outcome = runtime()
            .block_on(fetcher.fetch_at_least(plan, &LatestQuery::language("en")))
            .unwrap();

        let calls = provider.calls();
        prop_assert!(calls >= 1);
        prop_assert!(calls <= ceiling as usize);
        prop_assert!(calls <= pages);
        prop_assert_eq!(outcome.results.len(), calls * page_size);

        let stopped_early = outcome.results.len() < min_results
            && calls < ceiling as usize
            && calls < pages;
        prop_assert!(!stopped_early);
    }

    /// Property: cache keys ignore case and surrounding whitespace.
    #[test]
    fn prop_cache_key_normalizes_dimension(lang in "[a-zA-Z]{2,5}", pad in " {0,3}") {
        let padded = format!("{pad}{lang}{pad}");
        prop_assert_eq!(
            CacheKey::latest_by_language(&padded),
            CacheKey::latest_by_language(&lang.to_lowercase())
        );
    }
}
