//! Per-user saved history and merge semantics.

use super::article::{Article, Identified};
use super::interest::InterestProfile;
use super::source::Source;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

/// Maximum length of a user identifier.
pub const MAX_USER_ID_LENGTH: usize = 128;

/// Pattern a user identifier must match.
static USER_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|_| unreachable!())
});

/// Validated identifier of the user owning a history record.
///
/// Accepts 1 to 128 characters of `[A-Za-z0-9_-]`, which covers both
/// 24-character hex document ids and short opaque ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Parses and validates a user identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the identifier is empty, too long or
    /// contains unsupported characters.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidInput("user id is required".to_string()));
        }
        if raw.len() > MAX_USER_ID_LENGTH {
            return Err(Error::InvalidInput(format!(
                "user id exceeds {MAX_USER_ID_LENGTH} characters"
            )));
        }
        if !USER_ID_PATTERN.is_match(raw) {
            return Err(Error::InvalidInput("invalid user id format".to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Everything a user has saved.
///
/// Articles and sources are each unique by identifier and kept in the order
/// they were first saved. `version` increases by one on every persisted write
/// and backs optimistic concurrency in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHistory {
    /// Owner of the record.
    pub user_id: UserId,
    /// Saved articles.
    #[serde(default)]
    pub articles: Vec<Article>,
    /// Saved sources.
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Write version (0 = never persisted).
    #[serde(default)]
    pub version: u64,
    /// Creation time (Unix seconds).
    #[serde(default)]
    pub created_at: u64,
    /// Last modification time (Unix seconds).
    #[serde(default)]
    pub updated_at: u64,
}

impl UserHistory {
    /// Creates an empty, never-persisted history.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = crate::current_timestamp();
        Self {
            user_id,
            articles: Vec::new(),
            sources: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a first history from a submission.
    ///
    /// Duplicates inside the submission collapse to one entry per identifier.
    #[must_use]
    pub fn from_submission(user_id: UserId, articles: Vec<Article>, sources: Vec<Source>) -> Self {
        let mut history = Self::new(user_id);
        history.articles = dedup_by_identifier(articles);
        history.sources = dedup_by_identifier(sources);
        history
    }

    /// Returns `true` if nothing has been saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty() && self.sources.is_empty()
    }

    /// Appends the submitted items whose identifiers are not yet present.
    ///
    /// Returns how many articles and sources were added. Re-submitting an
    /// item that is already saved leaves the record unchanged.
    pub fn merge(&mut self, articles: Vec<Article>, sources: Vec<Source>) -> (usize, usize) {
        let articles_added = append_unique(&mut self.articles, articles);
        let sources_added = append_unique(&mut self.sources, sources);
        if articles_added + sources_added > 0 {
            self.updated_at = crate::current_timestamp();
        }
        (articles_added, sources_added)
    }

    /// Derives the interest profile from the saved articles.
    #[must_use]
    pub fn interest_profile(&self) -> InterestProfile {
        InterestProfile::from_articles(&self.articles)
    }
}

/// Collapses items sharing an identifier.
///
/// Each identifier keeps the position of its first occurrence and the value
/// of its last occurrence.
pub fn dedup_by_identifier<T: Identified>(items: Vec<T>) -> Vec<T> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(items.len());
    let mut unique: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        let existing = positions.get(item.identifier()).copied();
        match existing {
            Some(index) => unique[index] = item,
            None => {
                positions.insert(item.identifier().to_string(), unique.len());
                unique.push(item);
            },
        }
    }

    unique
}

/// Appends incoming items whose identifiers are absent from `existing`.
fn append_unique<T: Identified>(existing: &mut Vec<T>, incoming: Vec<T>) -> usize {
    let known: HashSet<String> = existing
        .iter()
        .map(|item| item.identifier().to_string())
        .collect();

    let fresh: Vec<T> = dedup_by_identifier(incoming)
        .into_iter()
        .filter(|item| !known.contains(item.identifier()))
        .collect();

    let added = fresh.len();
    existing.extend(fresh);
    added
}

/// Body of a save request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Articles to save.
    #[serde(default)]
    pub articles: Option<Vec<Article>>,
    /// Sources to save.
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
}

impl SaveRequest {
    /// Creates a request saving only articles.
    #[must_use]
    pub fn articles(articles: Vec<Article>) -> Self {
        Self {
            articles: Some(articles),
            sources: None,
        }
    }

    /// Creates a request saving only sources.
    #[must_use]
    pub fn sources(sources: Vec<Source>) -> Self {
        Self {
            articles: None,
            sources: Some(sources),
        }
    }

    /// Validates the request and splits it into its two collections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if both collections are empty or any
    /// item carries an empty identifier.
    pub fn into_parts(self) -> Result<(Vec<Article>, Vec<Source>)> {
        let articles = self.articles.unwrap_or_default();
        let sources = self.sources.unwrap_or_default();

        if articles.is_empty() && sources.is_empty() {
            return Err(Error::InvalidInput(
                "at least one article or source is required".to_string(),
            ));
        }
        if articles.iter().any(|a| a.identifier().trim().is_empty()) {
            return Err(Error::InvalidInput(
                "every article needs an article_id".to_string(),
            ));
        }
        if sources.iter().any(|s| s.identifier().trim().is_empty()) {
            return Err(Error::InvalidInput("every source needs an id".to_string()));
        }

        Ok((articles, sources))
    }
}

/// Whether a save created the history or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStatus {
    /// The history did not exist before this save.
    Created,
    /// The history existed; unique items were appended.
    Updated,
}

impl MergeStatus {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }
}

/// Outcome of a save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    /// Created or updated.
    pub status: MergeStatus,
    /// The full history after the save.
    pub history: UserHistory,
    /// Number of articles newly stored.
    pub articles_added: usize,
    /// Number of sources newly stored.
    pub sources_added: usize,
}
