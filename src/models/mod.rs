//! Data models for newsroom.
//!
//! Provider records ([`Article`], [`Source`]) are treated as opaque documents
//! identified by a stable id; everything else is owned by this crate.

mod article;
mod history;
mod interest;
mod recommendation;
mod result_set;
mod source;

pub use article::{Article, Identified};
pub use history::{
    MAX_USER_ID_LENGTH, MergeResult, MergeStatus, SaveRequest, UserHistory, UserId,
    dedup_by_identifier,
};
pub use interest::InterestProfile;
pub use recommendation::{RecommendationMode, Recommendations};
pub use result_set::{Page, ResultSet, STATUS_SUCCESS};
pub use source::Source;
