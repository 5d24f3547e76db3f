//! Tag directory data types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tag record.
pub type TagId = i64;

/// Usage counts keyed by tag id.
pub type TagCounts = HashMap<TagId, u64>;

/// A tag record, optionally enriched with its usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Unique external key, used in public URLs.
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Number of content items referencing this tag. Computed per read, never persisted.
    #[serde(default)]
    pub count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update for a tag. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Keyword filter applied as an unanchored regex over name, slug and description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub keyword: Option<String>,
}

impl TagFilter {
    /// Filter matching every tag.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on a keyword. An empty keyword matches everything.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            keyword: (!keyword.is_empty()).then_some(keyword),
        }
    }
}

/// Page selection for a tag query. `page` is 1-based; tags come newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Newest-first page of `limit` tags.
    pub fn newest_first(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub(crate) fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of tags plus pagination totals.
///
/// Produced fresh by every computation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPage {
    pub items: Vec<Tag>,
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub per_page: u32,
}

impl TagPage {
    /// Build a page, deriving the page count. An empty result still reports one page.
    pub fn new(items: Vec<Tag>, total: u64, pagination: &Pagination) -> Self {
        let total_pages = if pagination.limit == 0 {
            1
        } else {
            total.div_ceil(u64::from(pagination.limit)).max(1)
        };
        Self {
            items,
            total,
            page: pagination.page,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            per_page: pagination.limit,
        }
    }

    /// Set each tag's count from `counts`, defaulting to zero.
    pub fn with_counts(mut self, counts: &TagCounts) -> Self {
        for tag in &mut self.items {
            tag.count = counts.get(&tag.id).copied().unwrap_or(0);
        }
        self
    }
}

/// Which content items count towards a tag's usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only published, public content.
    PublicOnly,
    /// Every content item.
    All,
}

/// Publication state of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    Recycled,
    Draft,
    Published,
}

impl ContentState {
    pub(crate) fn as_i64(self) -> i64 {
        match self {
            ContentState::Recycled => -1,
            ContentState::Draft => 0,
            ContentState::Published => 1,
        }
    }
}

/// A content item to insert into the content collection.
#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub title: String,
    pub state: ContentState,
    pub public: bool,
    pub tags: Vec<TagId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: TagId) -> Tag {
        Tag {
            id,
            name: format!("tag{id}"),
            slug: format!("tag-{id}"),
            description: String::new(),
            count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_page_counts_round_up() {
        let page = TagPage::new(vec![], 25, &Pagination::newest_first(1, 12));
        assert_eq!(page.total_pages, 3);

        let page = TagPage::new(vec![], 24, &Pagination::newest_first(2, 12));
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 2);
    }

    #[test]
    fn test_empty_page_reports_one_page() {
        let page = TagPage::new(vec![], 0, &Pagination::newest_first(1, 12));
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_with_counts_defaults_to_zero() {
        let page = TagPage::new(vec![tag(1), tag(2)], 2, &Pagination::newest_first(1, 12));
        let counts = TagCounts::from([(1, 4)]);

        let page = page.with_counts(&counts);
        assert_eq!(page.items[0].count, 4);
        assert_eq!(page.items[1].count, 0);
    }

    #[test]
    fn test_empty_keyword_is_no_filter() {
        assert_eq!(TagFilter::keyword(""), TagFilter::all());
        assert_eq!(TagFilter::keyword("spo").keyword.as_deref(), Some("spo"));
    }
}
