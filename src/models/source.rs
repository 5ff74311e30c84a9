//! Provider source (publisher) records.

use super::article::{Identified, null_as_default};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A news source as listed by the upstream provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable provider-assigned identifier.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Home page.
    #[serde(default)]
    pub url: Option<String>,
    /// Icon.
    #[serde(default)]
    pub icon: Option<String>,
    /// Provider ranking.
    #[serde(default)]
    pub priority: Option<i64>,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Categories the source covers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Vec<String>,
    /// Languages the source publishes in.
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: Vec<String>,
    /// Countries the source covers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: Vec<String>,
    /// Number of articles the provider indexed for this source.
    #[serde(default)]
    pub total_article: Option<i64>,
    /// When the provider last crawled the source.
    #[serde(default)]
    pub last_fetch: Option<String>,
    /// Provider fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source {
    /// Creates a source with only an identifier set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the home page.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns `true` if the source has a non-empty url and description.
    ///
    /// Only such sources are offered as recommendations.
    #[must_use]
    pub fn is_presentable(&self) -> bool {
        let filled = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.url) && filled(&self.description)
    }
}

impl Identified for Source {
    fn identifier(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentable_requires_url_and_description() {
        assert!(!Source::new("s1").is_presentable());
        assert!(!Source::new("s1").with_url("https://a.in").is_presentable());
        assert!(!Source::new("s1").with_description("news").is_presentable());
        assert!(
            !Source::new("s1")
                .with_url("https://a.in")
                .with_description("  ")
                .is_presentable()
        );
        assert!(
            Source::new("s1")
                .with_url("https://a.in")
                .with_description("news")
                .is_presentable()
        );
    }

    #[test]
    fn test_language_list_decodes() {
        let json = r#"{"id":"thehindu","name":"The Hindu","language":["english"],"category":null}"#;
        let source: Source = serde_json::from_str(json).expect("valid source json");
        assert_eq!(source.identifier(), "thehindu");
        assert_eq!(source.language, vec!["english"]);
        assert!(source.category.is_empty());
    }
}
