//! Storage backends.
//!
//! Two independent stores back the service:
//!
//! | Store | Trait | Backends |
//! |-------|-------|----------|
//! | Response cache | [`KeyValueStore`] | in-memory, Redis |
//! | Saved history | [`HistoryStore`] | in-memory, `SQLite` |
//!
//! The cache store is normally wrapped in a [`ResilientKeyValueStore`] so a
//! dead Redis degrades to upstream fetches instead of slow requests.

pub mod history;
pub mod kv;
pub mod resilience;
pub mod traits;

pub use history::{InMemoryHistoryStore, SqliteHistoryStore};
pub use kv::{InMemoryKeyValueStore, RedisKeyValueStore};
pub use resilience::{BreakerConfig, CircuitBreaker, ResilientKeyValueStore};
pub use traits::{HistoryStore, KeyValueStore, WriteOutcome};
