//! Durable key/value cache store trait.

use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for durable key/value stores with per-entry expiry.
///
/// Stores are shared with other processes and writers; implementations
/// never assume exclusive access. Any transport failure surfaces as
/// [`crate::Error::CacheUnavailable`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Writes `value` under `key`, expiring after `ttl`.
    ///
    /// The write must be visible to subsequent reads once this returns.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Reads `key`, returning `None` if it was never written or has expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;
}
