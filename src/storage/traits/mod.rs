//! Storage backend traits.

mod history;
mod kv;

pub use history::{HistoryStore, WriteOutcome};
pub use kv::KeyValueStore;
