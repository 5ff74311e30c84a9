//! History document store backends.

mod memory;
mod sqlite;

pub use memory::InMemoryHistoryStore;
pub use sqlite::SqliteHistoryStore;
