//! Aggregated result sets and provider pages.

use serde::{Deserialize, Serialize};

/// Status string of a successful result set.
pub const STATUS_SUCCESS: &str = "success";

/// One page as returned by the upstream provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page.
    pub results: Vec<T>,
    /// Opaque token for the following page, if the provider has one.
    pub next_page: Option<String>,
}

impl<T> Page<T> {
    /// Creates a page.
    #[must_use]
    pub const fn new(results: Vec<T>, next_page: Option<String>) -> Self {
        Self { results, next_page }
    }
}

/// Records gathered across one or more provider pages.
///
/// `total_results` is the record count at assembly time. A cached result set
/// keeps the count it was stored with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSet<T> {
    /// Always `"success"` for assembled sets.
    pub status: String,
    /// Number of records in `results`.
    pub total_results: usize,
    /// Records in provider order.
    pub results: Vec<T>,
    /// Last token the provider returned, for "load more".
    pub next_page: Option<String>,
}

impl<T> ResultSet<T> {
    /// Assembles a result set, counting the records.
    #[must_use]
    pub fn new(results: Vec<T>, next_page: Option<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            total_results: results.len(),
            results,
            next_page,
        }
    }
}

impl<T> From<Page<T>> for ResultSet<T> {
    fn from(page: Page<T>) -> Self {
        Self::new(page.results, page.next_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_set_counts_results() {
        let set = ResultSet::new(vec![1, 2, 3], Some("tok".to_string()));
        assert_eq!(set.total_results, 3);
        assert_eq!(set.status, STATUS_SUCCESS);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let set = ResultSet::new(vec!["a"], None);
        let json = serde_json::to_value(&set).expect("serializable");
        assert_eq!(json["totalResults"], 1);
        assert!(json["nextPage"].is_null());
    }
}
