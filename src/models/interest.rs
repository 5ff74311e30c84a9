//! Interest profiles derived from saved articles.

use super::article::Article;
use std::collections::HashSet;

/// Keywords, categories and source identifiers a user has shown interest in.
///
/// Derived on demand from saved articles and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterestProfile {
    /// Keywords of saved articles.
    pub keywords: HashSet<String>,
    /// Categories of saved articles.
    pub categories: HashSet<String>,
    /// Publishing sources of saved articles.
    pub source_ids: HashSet<String>,
}

impl InterestProfile {
    /// Scans articles and collects their keywords, categories and sources.
    #[must_use]
    pub fn from_articles(articles: &[Article]) -> Self {
        let mut profile = Self::default();
        for article in articles {
            profile.keywords.extend(article.keywords.iter().cloned());
            profile.categories.extend(article.category.iter().cloned());
            if let Some(source_id) = article.source_id.as_ref().filter(|s| !s.is_empty()) {
                profile.source_ids.insert(source_id.clone());
            }
        }
        profile
    }

    /// Returns `true` if the profile holds no interests at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.categories.is_empty() && self.source_ids.is_empty()
    }

    /// Returns `true` if the article shares a keyword, a category or its source.
    ///
    /// Any single overlap qualifies; matches are not weighted.
    #[must_use]
    pub fn matches(&self, article: &Article) -> bool {
        article.keywords.iter().any(|k| self.keywords.contains(k))
            || article.category.iter().any(|c| self.categories.contains(c))
            || article
                .source_id
                .as_ref()
                .is_some_and(|s| self.source_ids.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> InterestProfile {
        InterestProfile::from_articles(&[
            Article::new("a1")
                .with_keywords(["election"])
                .with_categories(["politics"]),
            Article::new("a2").with_source_id("thehindu"),
        ])
    }

    #[test]
    fn test_profile_collects_all_dimensions() {
        let p = profile();
        assert!(p.keywords.contains("election"));
        assert!(p.categories.contains("politics"));
        assert!(p.source_ids.contains("thehindu"));
        assert!(!p.is_empty());
    }

    #[test]
    fn test_matches_on_any_single_dimension() {
        let p = profile();
        assert!(p.matches(&Article::new("x").with_keywords(["election", "vote"])));
        assert!(p.matches(&Article::new("x").with_categories(["politics"])));
        assert!(p.matches(&Article::new("x").with_source_id("thehindu")));
        assert!(!p.matches(&Article::new("x").with_keywords(["cricket"])));
    }

    #[test]
    fn test_keyword_matching_is_exact() {
        let p = profile();
        assert!(!p.matches(&Article::new("x").with_keywords(["Election"])));
    }

    #[test]
    fn test_empty_source_id_is_ignored() {
        let p = InterestProfile::from_articles(&[Article::new("a").with_source_id("")]);
        assert!(p.is_empty());
    }
}
