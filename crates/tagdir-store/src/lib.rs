//! Tag storage for tagdir.
//!
//! This crate owns the persistent side of the tag directory:
//! - [`TagStore`]: paginated keyword queries and point CRUD over tag records
//! - [`CountAggregator`]: per-tag usage counts over the content collection
//! - [`SqliteStore`]: the SQLite implementation of both

mod aggregate;
mod db;
mod error;
mod store;
mod types;

pub use aggregate::CountAggregator;
pub use db::SqliteStore;
pub use error::{AggregationError, StoreError};
pub use store::TagStore;
pub use types::{
    ContentState, NewContentItem, NewTag, Pagination, Tag, TagCounts, TagFilter, TagId,
    TagPage, TagPatch, Visibility,
};
