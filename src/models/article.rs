//! Provider article records.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Records that carry a stable, provider-assigned identifier.
///
/// History merges and recommendation padding de-duplicate on this value.
pub trait Identified {
    /// Returns the stable identifier of the record.
    fn identifier(&self) -> &str;
}

/// Deserializes JSON `null` (or a missing field) as the type's default.
///
/// The provider sends `"keywords": null` rather than an empty list.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A news article as returned by the upstream provider.
///
/// Articles are copied whole into a user's history so they survive upstream
/// churn. Fields the crate does not interpret are kept in [`Article::extra`]
/// and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable provider-assigned identifier.
    #[serde(default, deserialize_with = "null_as_default")]
    pub article_id: String,
    /// Headline.
    #[serde(default)]
    pub title: Option<String>,
    /// Canonical link to the article.
    #[serde(default)]
    pub link: Option<String>,
    /// Short description or teaser.
    #[serde(default)]
    pub description: Option<String>,
    /// Full content, when the provider plan exposes it.
    #[serde(default)]
    pub content: Option<String>,
    /// Provider keywords.
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    /// Authors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub creator: Vec<String>,
    /// Attached video, if any.
    #[serde(default)]
    pub video_url: Option<String>,
    /// Publish timestamp as sent by the provider.
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    /// Time zone of [`Article::pub_date`].
    #[serde(default, rename = "pubDateTZ")]
    pub pub_date_tz: Option<String>,
    /// Lead image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Identifier of the publishing source.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Display name of the publishing source.
    #[serde(default)]
    pub source_name: Option<String>,
    /// Home page of the publishing source.
    #[serde(default)]
    pub source_url: Option<String>,
    /// Icon of the publishing source.
    #[serde(default)]
    pub source_icon: Option<String>,
    /// Provider ranking of the source.
    #[serde(default)]
    pub source_priority: Option<i64>,
    /// Article language.
    #[serde(default)]
    pub language: Option<String>,
    /// Countries the article is filed under.
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: Vec<String>,
    /// Categories the article is filed under.
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: Vec<String>,
    /// Provider duplicate marker.
    #[serde(default)]
    pub duplicate: Option<bool>,
    /// Provider fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    /// Creates an article with only an identifier set.
    #[must_use]
    pub fn new(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            ..Self::default()
        }
    }

    /// Sets the keywords.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the categories.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the publishing source identifier.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Sets the headline.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

impl Identified for Article {
    fn identifier(&self) -> &str {
        &self.article_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_lists_decode_as_empty() {
        let json = r#"{"article_id":"a1","keywords":null,"category":null,"country":["india"]}"#;
        let article: Article = serde_json::from_str(json).expect("valid article json");
        assert_eq!(article.article_id, "a1");
        assert!(article.keywords.is_empty());
        assert!(article.category.is_empty());
        assert_eq!(article.country, vec!["india".to_string()]);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let json = r#"{"article_id":"a1","ai_tag":"politics","sentiment":"neutral","pubDate":"2025-01-01 10:00:00"}"#;
        let article: Article = serde_json::from_str(json).expect("valid article json");
        assert_eq!(article.pub_date.as_deref(), Some("2025-01-01 10:00:00"));
        assert_eq!(
            article.extra.get("ai_tag"),
            Some(&Value::String("politics".to_string()))
        );

        let back = serde_json::to_value(&article).expect("serializable");
        assert_eq!(back["sentiment"], "neutral");
        assert_eq!(back["pubDate"], "2025-01-01 10:00:00");
    }

    #[test]
    fn test_builder_sets_interest_fields() {
        let article = Article::new("a9")
            .with_keywords(["election"])
            .with_categories(["politics"])
            .with_source_id("hindu");
        assert_eq!(article.identifier(), "a9");
        assert_eq!(article.keywords, vec!["election"]);
        assert_eq!(article.category, vec!["politics"]);
        assert_eq!(article.source_id.as_deref(), Some("hindu"));
    }
}
