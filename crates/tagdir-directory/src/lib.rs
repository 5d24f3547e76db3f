//! Cached tag directory for tagdir.
//!
//! Public list requests are answered from a single-slot [`FreshnessCache`]
//! holding the canonical tag listing. A process-wide [`RefreshThrottle`]
//! lets at most one background recomputation start per cooldown window, so
//! count aggregation cost stays flat regardless of request volume.
//! Authorized callers bypass the cache and always get a fresh computation.
//!
//! Tag writes go through [`TagMutations`], which validate slug uniqueness and
//! notify the sitemap and search-engine collaborators.

mod cache;
mod error;
mod hooks;
mod listing;
mod mutations;
mod service;
mod throttle;

pub use cache::FreshnessCache;
pub use error::DirectoryError;
pub use hooks::{Disabled, HookError, PublishHooks, SearchNotifier, SitemapBuilder, tag_url};
pub use listing::{Caller, ListQuery, ListingPagination, TagListing};
pub use mutations::TagMutations;
pub use service::{DirectoryConfig, DirectoryService};
pub use throttle::RefreshThrottle;
