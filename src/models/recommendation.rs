//! Recommendation payloads.

use super::article::Article;
use super::source::Source;
use serde::{Deserialize, Serialize};

/// How a recommendation was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMode {
    /// No saved history; latest articles verbatim.
    ColdStart,
    /// Filtered against the user's interest profile.
    Personalized,
}

impl RecommendationMode {
    /// Returns the mode as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ColdStart => "cold_start",
            Self::Personalized => "personalized",
        }
    }
}

/// Sources and articles recommended to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    /// Presentable sources, provider order.
    pub recommended_sources: Vec<Source>,
    /// Same list as `recommended_sources`.
    pub suggested_publishers: Vec<Source>,
    /// Interest matches first, then latest articles as padding.
    pub recommended_articles: Vec<Article>,
    /// Cold start or personalized.
    pub mode: RecommendationMode,
}
