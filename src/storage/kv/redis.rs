//! Redis key/value store.
//!
//! Values are written with `SET key value EX ttl`, so expiry is enforced by the
//! server and shared by every process pointed at the same instance. Commands
//! run through a multiplexed connection manager that reconnects on its own.

#[cfg(feature = "redis")]
mod implementation {
    use crate::storage::traits::KeyValueStore;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;
    use std::time::Duration;

    /// Upper bound on a single Redis command.
    const REDIS_TIMEOUT: Duration = Duration::from_secs(5);

    /// Redis-backed key/value store.
    #[derive(Clone)]
    pub struct RedisKeyValueStore {
        manager: ConnectionManager,
    }

    impl std::fmt::Debug for RedisKeyValueStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RedisKeyValueStore").finish_non_exhaustive()
        }
    }

    impl RedisKeyValueStore {
        /// Connects to the Redis server at `url`.
        ///
        /// # Errors
        ///
        /// Returns [`Error::CacheUnavailable`] if the URL is invalid or the
        /// server cannot be reached.
        pub async fn connect(url: &str) -> Result<Self> {
            let client = redis::Client::open(url).map_err(|e| Error::cache("connect", e))?;
            let manager = tokio::time::timeout(REDIS_TIMEOUT, client.get_connection_manager())
                .await
                .map_err(|_| Error::cache("connect", "timed out"))?
                .map_err(|e| Error::cache("connect", e))?;
            tracing::info!("connected to redis cache");
            Ok(Self { manager })
        }
    }

    #[async_trait]
    impl KeyValueStore for RedisKeyValueStore {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
            let mut conn = self.manager.clone();
            let seconds = ttl.as_secs().max(1);
            tokio::time::timeout(REDIS_TIMEOUT, conn.set_ex::<_, _, ()>(key, value, seconds))
                .await
                .map_err(|_| Error::cache("set", "timed out"))?
                .map_err(|e| Error::cache("set", e))
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            let mut conn = self.manager.clone();
            tokio::time::timeout(REDIS_TIMEOUT, conn.get::<_, Option<String>>(key))
                .await
                .map_err(|_| Error::cache("get", "timed out"))?
                .map_err(|e| Error::cache("get", e))
        }
    }
}

#[cfg(not(feature = "redis"))]
mod stub {
    use crate::storage::traits::KeyValueStore;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Stub Redis store when the feature is not enabled.
    #[derive(Debug, Clone)]
    pub struct RedisKeyValueStore;

    impl RedisKeyValueStore {
        /// Connects to Redis (stub).
        ///
        /// # Errors
        ///
        /// Always returns an error because the feature is not enabled.
        pub async fn connect(_url: &str) -> Result<Self> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }
    }

    #[async_trait]
    impl KeyValueStore for RedisKeyValueStore {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }
    }
}

#[cfg(feature = "redis")]
pub use implementation::RedisKeyValueStore;

#[cfg(not(feature = "redis"))]
pub use stub::RedisKeyValueStore;
