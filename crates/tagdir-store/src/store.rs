//! The tag store interface.

use crate::error::StoreError;
use crate::types::{NewTag, Pagination, Tag, TagFilter, TagId, TagPage, TagPatch};

/// Persistent collection of tag records.
///
/// Implementations must be safe to share across request workers; each
/// operation is atomic on its own but no operation spans several calls.
pub trait TagStore: Send + Sync {
    /// Query one page of tags matching `filter`. Returned tags carry `count == 0`.
    fn query(&self, filter: &TagFilter, pagination: &Pagination) -> Result<TagPage, StoreError>;

    /// Look up a tag by slug.
    fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError>;

    /// Look up a tag by id.
    fn find_by_id(&self, id: TagId) -> Result<Option<Tag>, StoreError>;

    /// Every tag, newest first.
    fn all(&self) -> Result<Vec<Tag>, StoreError>;

    /// Insert a tag. Fails with [`StoreError::DuplicateKey`] if the slug is taken.
    ///
    /// `name` and `slug` must already be validated as present.
    fn insert(&self, tag: &NewTag) -> Result<Tag, StoreError>;

    /// Apply a patch. `Ok(None)` means no tag has this id.
    fn update_by_id(&self, id: TagId, patch: &TagPatch) -> Result<Option<Tag>, StoreError>;

    /// Delete one tag, returning how many records were removed (0 or 1).
    fn delete_by_id(&self, id: TagId) -> Result<u64, StoreError>;

    /// Delete a set of tags, returning how many records were removed.
    fn delete_by_ids(&self, ids: &[TagId]) -> Result<u64, StoreError>;
}
