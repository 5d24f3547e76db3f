//! External collaborators notified after successful tag writes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

/// Error type returned by collaborators. Only ever logged.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Regenerates the public sitemap.
#[async_trait]
pub trait SitemapBuilder: Send + Sync {
    async fn rebuild(&self) -> Result<(), HookError>;
}

/// Tells a search engine about new or changed public URLs.
#[async_trait]
pub trait SearchNotifier: Send + Sync {
    async fn notify_created(&self, url: &str) -> Result<(), HookError>;
    async fn notify_updated(&self, url: &str) -> Result<(), HookError>;
}

/// Collaborator used when a side effect is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

#[async_trait]
impl SitemapBuilder for Disabled {
    async fn rebuild(&self) -> Result<(), HookError> {
        debug!("sitemap output not configured, skipping rebuild");
        Ok(())
    }
}

#[async_trait]
impl SearchNotifier for Disabled {
    async fn notify_created(&self, url: &str) -> Result<(), HookError> {
        debug!(url, "search push not configured, skipping");
        Ok(())
    }

    async fn notify_updated(&self, url: &str) -> Result<(), HookError> {
        debug!(url, "search push not configured, skipping");
        Ok(())
    }
}

/// The collaborators a mutation fans out to.
#[derive(Clone)]
pub struct PublishHooks {
    pub site_url: String,
    pub sitemap: Arc<dyn SitemapBuilder>,
    pub search: Arc<dyn SearchNotifier>,
}

impl PublishHooks {
    pub fn new(
        site_url: impl Into<String>,
        sitemap: Arc<dyn SitemapBuilder>,
        search: Arc<dyn SearchNotifier>,
    ) -> Self {
        Self {
            site_url: site_url.into(),
            sitemap,
            search,
        }
    }

    /// Hooks that do nothing.
    pub fn disabled(site_url: impl Into<String>) -> Self {
        Self::new(site_url, Arc::new(Disabled), Arc::new(Disabled))
    }
}

/// Public URL of a tag page.
pub fn tag_url(site_url: &str, slug: &str) -> String {
    format!("{}/tag/{}", site_url.trim_end_matches('/'), slug)
}
