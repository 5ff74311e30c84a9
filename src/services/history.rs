//! Saved-history service.
//!
//! Saves are read-modify-write cycles on one document per user. Inside a
//! process they run one at a time per user; across processes each write is
//! conditional on the version that was read, and a lost race reloads and
//! merges again.

use crate::locks::KeyedLock;
use crate::models::{MergeResult, MergeStatus, SaveRequest, UserHistory, UserId};
use crate::storage::{HistoryStore, WriteOutcome};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Default number of conditional-write retries.
pub const DEFAULT_MAX_MERGE_RETRIES: u32 = 5;

/// Merges and reads per-user saved history.
pub struct HistoryService {
    store: Arc<dyn HistoryStore>,
    locks: KeyedLock,
    max_retries: u32,
}

impl std::fmt::Debug for HistoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryService")
            .field("store", &self.store.name())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl HistoryService {
    /// Creates the service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            locks: KeyedLock::new(),
            max_retries: DEFAULT_MAX_MERGE_RETRIES,
        }
    }

    /// Sets how many times a conflicting write is retried.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Merges the submitted articles and sources into the user's history.
    ///
    /// The first save creates the history; later saves append only items
    /// whose identifier is not stored yet. Saving something already saved
    /// changes nothing and reports `updated`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty request or blank item
    /// identifiers, and [`Error::StoreWriteFailure`] if the store fails or
    /// keeps reporting conflicts.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn save_news(&self, user_id: &UserId, request: SaveRequest) -> Result<MergeResult> {
        let (articles, sources) = request.into_parts()?;
        let _section = self.locks.lock(user_id.as_str()).await;

        for attempt in 0..=self.max_retries {
            let existing = self.store.find_one(user_id).await?;

            let (status, mut history, articles_added, sources_added, expected_version) =
                match existing {
                    None => {
                        let history = UserHistory::from_submission(
                            user_id.clone(),
                            articles.clone(),
                            sources.clone(),
                        );
                        let added = (history.articles.len(), history.sources.len());
                        (MergeStatus::Created, history, added.0, added.1, None)
                    },
                    Some(mut history) => {
                        let expected = Some(history.version);
                        let (a, s) = history.merge(articles.clone(), sources.clone());
                        (MergeStatus::Updated, history, a, s, expected)
                    },
                };

            let result = |history| MergeResult {
                status,
                history,
                articles_added,
                sources_added,
            };

            if status == MergeStatus::Updated && articles_added + sources_added == 0 {
                tracing::debug!("nothing new to save");
                metrics::counter!("newsroom_history_saves_total", "status" => "unchanged")
                    .increment(1);
                return Ok(result(history));
            }

            history.version += 1;
            match self.store.upsert(&history, expected_version).await? {
                WriteOutcome::Written => {
                    tracing::info!(
                        status = status.as_str(),
                        articles_added,
                        sources_added,
                        version = history.version,
                        "history saved"
                    );
                    metrics::counter!("newsroom_history_saves_total", "status" => status.as_str())
                        .increment(1);
                    return Ok(result(history));
                },
                WriteOutcome::Conflict => {
                    tracing::debug!(attempt, "history write conflicted, retrying");
                },
            }
        }

        metrics::counter!("newsroom_history_saves_total", "status" => "conflict").increment(1);
        Err(Error::store(
            "save_news",
            format!(
                "history for '{user_id}' kept changing after {} attempts",
                self.max_retries + 1
            ),
        ))
    }

    /// Returns the user's history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user never saved anything, or
    /// [`Error::StoreWriteFailure`] if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_history(&self, user_id: &UserId) -> Result<UserHistory> {
        self.find(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("no saved history for user '{user_id}'")))
    }

    /// Returns the user's history, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreWriteFailure`] if the store fails.
    pub async fn find(&self, user_id: &UserId) -> Result<Option<UserHistory>> {
        self.store.find_one(user_id).await
    }
}
