//! XML sitemap of every tag page.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::info;

use tagdir_directory::{HookError, SitemapBuilder, tag_url};
use tagdir_store::{Tag, TagStore};

use crate::error::PublishError;

/// Writes `sitemap.xml` listing one `<url>` per tag.
pub struct XmlSitemap {
    store: Arc<dyn TagStore>,
    site_url: String,
    path: PathBuf,
}

impl XmlSitemap {
    pub fn new(store: Arc<dyn TagStore>, site_url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            site_url: site_url.into(),
            path: path.into(),
        }
    }

    /// Render and write the sitemap. The file is replaced atomically.
    pub async fn write(&self) -> Result<usize, PublishError> {
        let store = Arc::clone(&self.store);
        let site_url = self.site_url.clone();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let tags = store.all()?;
            let xml = render(&site_url, &tags);
            persist(&path, xml.as_bytes())?;
            Ok::<_, PublishError>(tags.len())
        })
        .await?
    }
}

#[async_trait]
impl SitemapBuilder for XmlSitemap {
    async fn rebuild(&self) -> Result<(), HookError> {
        let urls = self.write().await?;
        info!(path = %self.path.display(), urls, "sitemap rebuilt");
        Ok(())
    }
}

fn render(site_url: &str, tags: &[Tag]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for tag in tags {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            escape_xml(&tag_url(site_url, &tag.slug))
        ));
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            tag.updated_at.format("%Y-%m-%d")
        ));
        xml.push_str("    <changefreq>daily</changefreq>\n");
        xml.push_str("    <priority>0.6</priority>\n");
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

fn persist(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagdir_store::{NewTag, SqliteStore};
    use tempfile::TempDir;

    fn new_tag(slug: &str) -> NewTag {
        NewTag {
            name: Some(slug.to_string()),
            slug: Some(slug.to_string()),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_sitemap_lists_every_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitemap.xml");
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store.insert(&new_tag("rust")).unwrap();
        store.insert(&new_tag("r&d")).unwrap();

        let sitemap = XmlSitemap::new(store, "https://example.com/", &path);
        assert_eq!(sitemap.write().await.unwrap(), 2);

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://example.com/tag/rust</loc>"));
        assert!(xml.contains("<loc>https://example.com/tag/r&amp;d</loc>"));
        assert_eq!(xml.matches("<url>").count(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_sitemap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sitemap.xml");
        std::fs::write(&path, "stale").unwrap();
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());

        let sitemap = XmlSitemap::new(store, "https://example.com", &path);
        sitemap.rebuild().await.unwrap();

        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(!xml.contains("stale"));
        assert!(xml.contains("<urlset"));
        assert_eq!(xml.matches("<url>").count(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("sitemap.xml");
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());

        let sitemap = XmlSitemap::new(store, "https://example.com", &path);
        assert!(matches!(sitemap.write().await, Err(PublishError::Io(_))));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
    }
}
