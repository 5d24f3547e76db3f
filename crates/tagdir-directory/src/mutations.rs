//! Tag create, update and delete.
//!
//! Writes go straight to the store. They never touch the freshness cache:
//! the next throttled public refresh picks them up.

use std::sync::Arc;

use tagdir_store::{NewTag, Tag, TagId, TagPatch, TagStore};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::error::DirectoryError;
use crate::hooks::{PublishHooks, tag_url};

/// Search-engine notification that follows a write.
enum SearchPing {
    Created(String),
    Updated(String),
}

/// Validating tag writer.
pub struct TagMutations {
    store: Arc<dyn TagStore>,
    hooks: PublishHooks,
    tasks: TaskTracker,
}

impl TagMutations {
    pub fn new(store: Arc<dyn TagStore>, hooks: PublishHooks) -> Self {
        Self {
            store,
            hooks,
            tasks: TaskTracker::new(),
        }
    }

    /// Create a tag. The slug must be present and unused.
    #[tracing::instrument(skip_all, fields(slug = ?tag.slug))]
    pub async fn create(&self, tag: NewTag) -> Result<Tag, DirectoryError> {
        let slug = required(tag.slug.as_deref(), "slug")?;
        let name = required(tag.name.as_deref(), "name")?;

        let created = self
            .run(move |store| {
                if store.find_by_slug(&slug)?.is_some() {
                    return Err(DirectoryError::Conflict(format!(
                        "slug '{slug}' is already in use"
                    )));
                }
                Ok(store.insert(&NewTag {
                    name: Some(name),
                    slug: Some(slug),
                    description: tag.description,
                })?)
            })
            .await?;
        info!(id = created.id, slug = %created.slug, "created tag");

        let url = tag_url(&self.hooks.site_url, &created.slug);
        self.publish(Some(SearchPing::Created(url)));
        Ok(created)
    }

    /// Update a tag. The patch must carry a slug no other tag owns.
    #[tracing::instrument(skip(self, patch), fields(slug = ?patch.slug))]
    pub async fn update(&self, id: TagId, patch: TagPatch) -> Result<Tag, DirectoryError> {
        let slug = required(patch.slug.as_deref(), "slug")?;
        let name = match patch.name.as_deref() {
            Some(name) => Some(required(Some(name), "name")?),
            None => None,
        };

        let updated = self
            .run(move |store| {
                if let Some(owner) = store.find_by_slug(&slug)?
                    && owner.id != id
                {
                    return Err(DirectoryError::Conflict(format!(
                        "slug '{slug}' already exists"
                    )));
                }
                store
                    .update_by_id(
                        id,
                        &TagPatch {
                            name,
                            slug: Some(slug),
                            description: patch.description,
                        },
                    )?
                    .ok_or(DirectoryError::NotFound(id))
            })
            .await?;
        info!(id, slug = %updated.slug, "updated tag");

        let url = tag_url(&self.hooks.site_url, &updated.slug);
        self.publish(Some(SearchPing::Updated(url)));
        Ok(updated)
    }

    /// Delete one tag.
    pub async fn delete(&self, id: TagId) -> Result<u64, DirectoryError> {
        let deleted = self.run(move |store| Ok(store.delete_by_id(id)?)).await?;
        if deleted == 0 {
            return Err(DirectoryError::NotFound(id));
        }
        info!(id, "deleted tag");

        self.publish(None);
        Ok(deleted)
    }

    /// Delete a set of tags, returning how many existed.
    pub async fn delete_many(&self, ids: &[TagId]) -> Result<u64, DirectoryError> {
        if ids.is_empty() {
            return Err(DirectoryError::Validation("no tag ids given".into()));
        }

        let owned = ids.to_vec();
        let deleted = self
            .run(move |store| Ok(store.delete_by_ids(&owned)?))
            .await?;
        info!(requested = ids.len(), deleted, "bulk deleted tags");

        self.publish(None);
        Ok(deleted)
    }

    /// Run store work on the blocking pool, like list computations.
    async fn run<T, F>(&self, work: F) -> Result<T, DirectoryError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn TagStore) -> Result<T, DirectoryError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || work(store.as_ref())).await?
    }

    /// Fire the sitemap rebuild and the optional search ping, detached.
    fn publish(&self, ping: Option<SearchPing>) {
        let sitemap = Arc::clone(&self.hooks.sitemap);
        self.tasks.spawn(async move {
            if let Err(e) = sitemap.rebuild().await {
                warn!(error = %e, "sitemap rebuild failed");
            }
        });

        let Some(ping) = ping else {
            return;
        };
        let search = Arc::clone(&self.hooks.search);
        self.tasks.spawn(async move {
            let (url, result) = match ping {
                SearchPing::Created(url) => {
                    let result = search.notify_created(&url).await;
                    (url, result)
                }
                SearchPing::Updated(url) => {
                    let result = search.notify_updated(&url).await;
                    (url, result)
                }
            };
            if let Err(e) = result {
                warn!(error = %e, url, "search engine notification failed");
            }
        });
    }

    /// Wait for pending collaborator calls without stopping new ones.
    #[cfg(test)]
    pub(crate) async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Wait for pending collaborator calls before exit.
    pub async fn shutdown(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }
}

/// Trimmed value of a required field.
fn required(value: Option<&str>, field: &str) -> Result<String, DirectoryError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(DirectoryError::Validation(format!("missing {field}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tagdir_store::{Pagination, SqliteStore, StoreError, TagFilter, TagPage};

    use super::*;
    use crate::hooks::{HookError, SearchNotifier, SitemapBuilder};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            let mut events = self.events.lock().unwrap().clone();
            events.sort();
            events
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl SitemapBuilder for Recorder {
        async fn rebuild(&self) -> Result<(), HookError> {
            self.push("sitemap".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl SearchNotifier for Recorder {
        async fn notify_created(&self, url: &str) -> Result<(), HookError> {
            self.push(format!("created {url}"));
            Ok(())
        }

        async fn notify_updated(&self, url: &str) -> Result<(), HookError> {
            self.push(format!("updated {url}"));
            Ok(())
        }
    }

    struct FailingSitemap;

    #[async_trait]
    impl SitemapBuilder for FailingSitemap {
        async fn rebuild(&self) -> Result<(), HookError> {
            Err("disk full".into())
        }
    }

    fn setup() -> (TagMutations, Arc<SqliteStore>, Arc<Recorder>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let recorder = Arc::new(Recorder::default());
        let hooks = PublishHooks::new(
            "https://example.com",
            Arc::clone(&recorder) as Arc<dyn SitemapBuilder>,
            Arc::clone(&recorder) as Arc<dyn SearchNotifier>,
        );
        let mutations = TagMutations::new(Arc::clone(&store) as Arc<dyn TagStore>, hooks);
        (mutations, store, recorder)
    }

    fn new_tag(name: &str, slug: &str) -> NewTag {
        NewTag {
            name: Some(name.to_string()),
            slug: Some(slug.to_string()),
            description: None,
        }
    }

    fn patch(slug: &str) -> TagPatch {
        TagPatch {
            slug: Some(slug.to_string()),
            ..TagPatch::default()
        }
    }

    #[tokio::test]
    async fn test_create_notifies_collaborators() {
        let (mutations, store, recorder) = setup();

        let tag = mutations.create(new_tag("Foo", " foo ")).await.unwrap();
        mutations.drain().await;

        assert_eq!(tag.slug, "foo");
        assert!(store.find_by_slug("foo").unwrap().is_some());
        assert_eq!(
            recorder.events(),
            vec!["created https://example.com/tag/foo", "sitemap"]
        );
    }

    #[tokio::test]
    async fn test_create_requires_slug_and_name() {
        let (mutations, store, recorder) = setup();

        let missing_slug = NewTag {
            name: Some("Foo".to_string()),
            ..NewTag::default()
        };
        assert!(matches!(
            mutations.create(missing_slug).await,
            Err(DirectoryError::Validation(_))
        ));
        assert!(matches!(
            mutations.create(new_tag("   ", "foo")).await,
            Err(DirectoryError::Validation(_))
        ));

        mutations.drain().await;
        assert!(store.all().unwrap().is_empty());
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_conflicts_without_insert() {
        let (mutations, store, _) = setup();
        mutations.create(new_tag("Foo", "foo")).await.unwrap();

        let result = mutations.create(new_tag("Other Foo", "foo")).await;

        assert!(matches!(result, Err(DirectoryError::Conflict(_))));
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_to_taken_slug_is_rejected() {
        let (mutations, store, _) = setup();
        let a = mutations.create(new_tag("A", "a")).await.unwrap();
        mutations.create(new_tag("B", "bar")).await.unwrap();

        let result = mutations.update(a.id, patch("bar")).await;

        assert!(matches!(result, Err(DirectoryError::Conflict(_))));
        assert_eq!(store.find_by_id(a.id).unwrap().unwrap().slug, "a");
    }

    #[tokio::test]
    async fn test_update_to_own_slug_succeeds() {
        let (mutations, _, recorder) = setup();
        let a = mutations.create(new_tag("A", "a")).await.unwrap();
        mutations.drain().await;

        let updated = mutations
            .update(
                a.id,
                TagPatch {
                    name: Some("Renamed".to_string()),
                    slug: Some("a".to_string()),
                    description: Some("first letter".to_string()),
                },
            )
            .await
            .unwrap();
        mutations.drain().await;

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.description, "first letter");
        assert!(
            recorder
                .events()
                .contains(&"updated https://example.com/tag/a".to_string())
        );
    }

    #[tokio::test]
    async fn test_update_requires_slug() {
        let (mutations, _, _) = setup();
        let a = mutations.create(new_tag("A", "a")).await.unwrap();

        let result = mutations.update(a.id, TagPatch::default()).await;
        assert!(matches!(result, Err(DirectoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_missing_tag_is_not_found() {
        let (mutations, _, _) = setup();
        let result = mutations.update(7, patch("seven")).await;
        assert!(matches!(result, Err(DirectoryError::NotFound(7))));
    }

    #[tokio::test]
    async fn test_bulk_delete_empty_is_rejected() {
        let (mutations, store, recorder) = setup();
        mutations.create(new_tag("A", "a")).await.unwrap();
        mutations.drain().await;

        let result = mutations.delete_many(&[]).await;
        mutations.drain().await;

        assert!(matches!(result, Err(DirectoryError::Validation(_))));
        assert_eq!(store.all().unwrap().len(), 1);
        assert_eq!(recorder.events().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_delete_removes_exactly_given_ids() {
        let (mutations, store, recorder) = setup();
        let a = mutations.create(new_tag("A", "a")).await.unwrap();
        let b = mutations.create(new_tag("B", "b")).await.unwrap();
        let c = mutations.create(new_tag("C", "c")).await.unwrap();
        mutations.drain().await;

        let deleted = mutations.delete_many(&[a.id, b.id]).await.unwrap();
        mutations.drain().await;

        assert_eq!(deleted, 2);
        let remaining: Vec<_> = store.all().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![c.id]);
        // Three creates plus one delete rebuild; deletes send no search ping.
        let sitemap_rebuilds = recorder.events().iter().filter(|e| *e == "sitemap").count();
        assert_eq!(sitemap_rebuilds, 4);
    }

    #[tokio::test]
    async fn test_delete_missing_tag_is_not_found() {
        let (mutations, _, _) = setup();
        assert!(matches!(
            mutations.delete(99).await,
            Err(DirectoryError::NotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_collaborator_failure_does_not_fail_write() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let hooks = PublishHooks::new(
            "https://example.com",
            Arc::new(FailingSitemap),
            Arc::new(crate::hooks::Disabled),
        );
        let mutations = TagMutations::new(Arc::clone(&store) as Arc<dyn TagStore>, hooks);

        let tag = mutations.create(new_tag("A", "a")).await.unwrap();
        mutations.shutdown().await;

        assert_eq!(store.find_by_id(tag.id).unwrap().map(|t| t.slug), Some("a".to_string()));
    }

    /// Store that panics on every call.
    struct PanickingStore;

    impl TagStore for PanickingStore {
        fn query(&self, _: &TagFilter, _: &Pagination) -> Result<TagPage, StoreError> {
            panic!("store crashed")
        }
        fn find_by_slug(&self, _: &str) -> Result<Option<Tag>, StoreError> {
            panic!("store crashed")
        }
        fn find_by_id(&self, _: TagId) -> Result<Option<Tag>, StoreError> {
            panic!("store crashed")
        }
        fn all(&self) -> Result<Vec<Tag>, StoreError> {
            panic!("store crashed")
        }
        fn insert(&self, _: &NewTag) -> Result<Tag, StoreError> {
            panic!("store crashed")
        }
        fn update_by_id(&self, _: TagId, _: &TagPatch) -> Result<Option<Tag>, StoreError> {
            panic!("store crashed")
        }
        fn delete_by_id(&self, _: TagId) -> Result<u64, StoreError> {
            panic!("store crashed")
        }
        fn delete_by_ids(&self, _: &[TagId]) -> Result<u64, StoreError> {
            panic!("store crashed")
        }
    }

    #[tokio::test]
    async fn test_store_work_runs_off_the_async_worker() {
        let mutations = TagMutations::new(
            Arc::new(PanickingStore),
            PublishHooks::disabled("https://example.com"),
        );

        // The panic stays on the blocking pool and comes back as a task error.
        assert!(matches!(
            mutations.create(new_tag("A", "a")).await,
            Err(DirectoryError::Task(_))
        ));
        assert!(matches!(
            mutations.update(1, patch("a")).await,
            Err(DirectoryError::Task(_))
        ));
        assert!(matches!(
            mutations.delete_many(&[1, 2]).await,
            Err(DirectoryError::Task(_))
        ));
        mutations.shutdown().await;
    }
}
