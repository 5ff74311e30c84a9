//! Key/value cache store backends.

mod memory;
mod redis;

pub use memory::InMemoryKeyValueStore;
pub use self::redis::RedisKeyValueStore;
