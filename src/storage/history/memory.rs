//! In-memory history store.

use crate::Result;
use crate::models::{UserHistory, UserId};
use crate::storage::traits::{HistoryStore, WriteOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Process-local history store keyed by user id.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    documents: Mutex<HashMap<UserId, UserHistory>>,
}

impl InMemoryHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored histories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents().len()
    }

    /// Returns `true` if no histories are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<UserId, UserHistory>> {
        match self.documents.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("in-memory history mutex was poisoned, recovering");
                poisoned.into_inner()
            },
        }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_one(&self, user_id: &UserId) -> Result<Option<UserHistory>> {
        Ok(self.documents().get(user_id).cloned())
    }

    async fn upsert(
        &self,
        history: &UserHistory,
        expected_version: Option<u64>,
    ) -> Result<WriteOutcome> {
        let mut documents = self.documents();
        let current = documents.get(&history.user_id).map(|doc| doc.version);
        if current != expected_version {
            return Ok(WriteOutcome::Conflict);
        }
        documents.insert(history.user_id.clone(), history.clone());
        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;

    fn history(version: u64) -> UserHistory {
        let user = UserId::parse("u1").expect("valid id");
        let mut history = UserHistory::from_submission(user, vec![Article::new("a1")], vec![]);
        history.version = version;
        history
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let store = InMemoryHistoryStore::new();
        let doc = history(1);
        assert_eq!(
            store.upsert(&doc, None).await.expect("upsert"),
            WriteOutcome::Written
        );
        let found = store.find_one(&doc.user_id).await.expect("find");
        assert_eq!(found, Some(doc));
    }

    #[tokio::test]
    async fn test_insert_conflicts_when_present() {
        let store = InMemoryHistoryStore::new();
        store.upsert(&history(1), None).await.expect("upsert");
        assert_eq!(
            store.upsert(&history(1), None).await.expect("upsert"),
            WriteOutcome::Conflict
        );
    }

    #[tokio::test]
    async fn test_update_requires_matching_version() {
        let store = InMemoryHistoryStore::new();
        store.upsert(&history(1), None).await.expect("upsert");

        assert_eq!(
            store.upsert(&history(3), Some(2)).await.expect("upsert"),
            WriteOutcome::Conflict
        );
        assert_eq!(
            store.upsert(&history(2), Some(1)).await.expect("upsert"),
            WriteOutcome::Written
        );
        assert_eq!(store.len(), 1);
    }
}
