//! Per-user history document store trait.

use crate::Result;
use crate::models::{UserHistory, UserId};
use async_trait::async_trait;

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The document was stored.
    Written,
    /// Another writer got there first; reload and retry.
    Conflict,
}

/// Trait for history document stores.
///
/// Documents are keyed by user id. Writes are conditional on the version the
/// writer read, which closes the lost-update window between concurrent
/// merges for the same user.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Loads the history of `user_id`, if one exists.
    async fn find_one(&self, user_id: &UserId) -> Result<Option<UserHistory>>;

    /// Stores `history` if the current document still has `expected_version`.
    ///
    /// `None` inserts only when no document exists. `Some(v)` replaces only
    /// when the stored version is `v`. `history.version` is the version the
    /// document will carry after the write.
    async fn upsert(
        &self,
        history: &UserHistory,
        expected_version: Option<u64>,
    ) -> Result<WriteOutcome>;
}
