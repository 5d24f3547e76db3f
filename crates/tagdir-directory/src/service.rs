//! The directory service: cache-aside tag listing with throttled refresh.

use std::sync::Arc;
use std::time::Duration;

use tagdir_store::{
    CountAggregator, Pagination, TagCounts, TagFilter, TagPage, TagStore, Visibility,
};
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::cache::FreshnessCache;
use crate::error::DirectoryError;
use crate::listing::{Caller, ListQuery};
use crate::throttle::RefreshThrottle;

/// Minimum time between two background refreshes.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Page size of the cached public listing.
pub const DEFAULT_CANONICAL_PAGE_SIZE: u32 = 160;

/// Tuning for [`DirectoryService`].
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub refresh_cooldown: Duration,
    pub canonical_page_size: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
            canonical_page_size: DEFAULT_CANONICAL_PAGE_SIZE,
        }
    }
}

/// Answers tag list requests.
///
/// Public callers are served the cached canonical listing (newest first,
/// first page, no keyword). Each public read may also schedule one
/// background recomputation, subject to the [`RefreshThrottle`]. Authorized
/// callers always get a synchronous computation with every content item
/// counted.
pub struct DirectoryService {
    store: Arc<dyn TagStore>,
    counts: Arc<dyn CountAggregator>,
    cache: Arc<FreshnessCache>,
    throttle: RefreshThrottle,
    canonical: Pagination,
    tasks: TaskTracker,
    /// Serializes inline fills while the cache is cold.
    cold_fill: Mutex<()>,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn TagStore>,
        counts: Arc<dyn CountAggregator>,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            store,
            counts,
            cache: Arc::new(FreshnessCache::new()),
            throttle: RefreshThrottle::new(config.refresh_cooldown),
            canonical: Pagination::newest_first(1, config.canonical_page_size),
            tasks: TaskTracker::new(),
            cold_fill: Mutex::new(()),
        }
    }

    /// List tags for `caller`.
    ///
    /// Public callers ignore `query`: the cache only ever holds the canonical listing.
    pub async fn list(
        &self,
        caller: Caller,
        query: &ListQuery,
    ) -> Result<Arc<TagPage>, DirectoryError> {
        match caller {
            Caller::Authorized => {
                let (filter, pagination) = query.resolve()?;
                let page = compute(
                    Arc::clone(&self.store),
                    Arc::clone(&self.counts),
                    filter,
                    pagination,
                    Visibility::All,
                )
                .await?;
                Ok(Arc::new(page))
            }
            Caller::Public => self.list_public().await,
        }
    }

    async fn list_public(&self) -> Result<Arc<TagPage>, DirectoryError> {
        let cached = self.cache.get();
        let granted = self.throttle.try_open();

        match cached {
            Some(page) => {
                if granted {
                    self.spawn_refresh();
                }
                Ok(page)
            }
            // The inline fill stands in for this window's refresh.
            None => self.fill_cold().await,
        }
    }

    /// Compute the canonical listing inline, one caller at a time.
    async fn fill_cold(&self) -> Result<Arc<TagPage>, DirectoryError> {
        let _guard = self.cold_fill.lock().await;
        if let Some(page) = self.cache.get() {
            return Ok(page);
        }

        debug!("tag cache cold, computing canonical listing inline");
        let page = Arc::new(
            compute(
                Arc::clone(&self.store),
                Arc::clone(&self.counts),
                TagFilter::all(),
                self.canonical,
                Visibility::PublicOnly,
            )
            .await?,
        );
        self.cache.set(Arc::clone(&page));
        Ok(page)
    }

    /// Fill the cache once, ignoring the throttle. Failures are logged.
    pub async fn warm(&self) {
        refresh(
            Arc::clone(&self.store),
            Arc::clone(&self.counts),
            Arc::clone(&self.cache),
            self.canonical,
        )
        .await;
    }

    fn spawn_refresh(&self) {
        let store = Arc::clone(&self.store);
        let counts = Arc::clone(&self.counts);
        let cache = Arc::clone(&self.cache);
        let canonical = self.canonical;
        self.tasks
            .spawn(async move { refresh(store, counts, cache, canonical).await });
    }

    /// Wait for in-flight refreshes without stopping new ones.
    #[cfg(test)]
    pub(crate) async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Wait for in-flight refreshes before exit.
    pub async fn shutdown(&self) {
        self.tasks.close();
        if !self.tasks.is_empty() {
            info!(in_flight = self.tasks.len(), "waiting for tag refresh to finish");
        }
        self.tasks.wait().await;
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn throttle(&self) -> &RefreshThrottle {
        &self.throttle
    }
}

/// Recompute the canonical public listing and store it.
///
/// Runs detached from any request; errors end here.
async fn refresh(
    store: Arc<dyn TagStore>,
    counts: Arc<dyn CountAggregator>,
    cache: Arc<FreshnessCache>,
    canonical: Pagination,
) {
    match compute(store, counts, TagFilter::all(), canonical, Visibility::PublicOnly).await {
        Ok(page) => {
            debug!(total = page.total, items = page.items.len(), "tag cache refreshed");
            cache.set(Arc::new(page));
        }
        Err(e) => warn!(error = %e, "tag cache refresh failed"),
    }
}

/// Query a page and merge usage counts into it, off the async workers.
async fn compute(
    store: Arc<dyn TagStore>,
    counts: Arc<dyn CountAggregator>,
    filter: TagFilter,
    pagination: Pagination,
    visibility: Visibility,
) -> Result<TagPage, DirectoryError> {
    let page = tokio::task::spawn_blocking(move || {
        let page = store.query(&filter, &pagination)?;
        let counts = counts.count_by_tag(visibility).unwrap_or_else(|e| {
            warn!(error = %e, ?visibility, "tag counts unavailable, reporting zero");
            TagCounts::new()
        });
        Ok::<_, DirectoryError>(page.with_counts(&counts))
    })
    .await??;
    Ok(page)
}
