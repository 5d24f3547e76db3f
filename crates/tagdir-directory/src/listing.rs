//! List request and response shapes.

use serde::{Deserialize, Serialize};
use tagdir_store::{Pagination, Tag, TagFilter, TagPage};

use crate::error::DirectoryError;

/// Page size when the request does not name one.
pub const DEFAULT_PER_PAGE: u32 = 12;

/// Largest page an authorized caller may request.
pub const MAX_PER_PAGE: u32 = 500;

/// Who is asking. Decided by the authorization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Authorized,
    Public,
}

/// Query parameters of a list request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub keyword: Option<String>,
}

impl ListQuery {
    /// Apply defaults and bounds.
    pub fn resolve(&self) -> Result<(TagFilter, Pagination), DirectoryError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(DirectoryError::Validation("page must be at least 1".into()));
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(DirectoryError::Validation(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }

        let filter = TagFilter::keyword(self.keyword.clone().unwrap_or_default());
        Ok((filter, Pagination::newest_first(page, per_page)))
    }
}

/// Pagination block of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingPagination {
    pub total: u64,
    pub current_page: u32,
    pub total_page: u32,
    pub per_page: u32,
}

/// Body of a list response, borrowed from a computed page.
#[derive(Debug, Serialize)]
pub struct TagListing<'a> {
    pub pagination: ListingPagination,
    pub data: &'a [Tag],
}

impl<'a> From<&'a TagPage> for TagListing<'a> {
    fn from(page: &'a TagPage) -> Self {
        Self {
            pagination: ListingPagination {
                total: page.total,
                current_page: page.page,
                total_page: page.total_pages,
                per_page: page.per_page,
            },
            data: &page.items,
        }
    }
}
