//! In-memory key/value store with expiry.
//!
//! Deadlines use `tokio::time::Instant`, so tests can pause and advance the
//! runtime clock to exercise expiry without sleeping.

use crate::Result;
use crate::storage::traits::KeyValueStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local key/value store.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }

    /// Returns `true` if no live entries exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("in-memory cache mutex was poisoned, recovering");
                poisoned.into_inner()
            },
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries().insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            },
            None => Ok(None),
        }
    }
}
