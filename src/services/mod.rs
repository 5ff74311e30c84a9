//! Business logic services.
//!
//! Services orchestrate the cache, the upstream provider and the history
//! store, and expose the operations the HTTP surface and CLI call.

mod aggregation;
mod container;
mod history;
mod recommend;

pub use aggregation::{AggregationService, SearchFilters};
pub use container::ServiceContainer;
pub use history::{DEFAULT_MAX_MERGE_RETRIES, HistoryService};
pub use recommend::{Recommender, presentable_sources, rank_articles};
