//! Single-slot cache for the canonical public tag listing.

use std::sync::{Arc, PoisonError, RwLock};

use tagdir_store::TagPage;

/// Holds the last computed public listing.
///
/// There is exactly one logical entry and no expiry: freshness is bounded by
/// the [`RefreshThrottle`](crate::RefreshThrottle), not by the cache. Readers
/// get a shared handle to the snapshot; a write replaces it wholesale.
#[derive(Debug, Default)]
pub struct FreshnessCache {
    slot: RwLock<Option<Arc<TagPage>>>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, or `None` before the first fill.
    pub fn get(&self) -> Option<Arc<TagPage>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the snapshot. Last writer wins.
    pub fn set(&self, page: Arc<TagPage>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(page);
    }
}
