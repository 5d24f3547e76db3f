//! Tag usage aggregation over the content collection.

use rusqlite::params;
use tracing::debug;

use crate::db::SqliteStore;
use crate::error::AggregationError;
use crate::types::{ContentState, TagCounts, Visibility};

/// Computes how many content items reference each tag.
pub trait CountAggregator: Send + Sync {
    /// Count content items per tag under the given visibility scope.
    ///
    /// Tags no content refers to are absent from the map.
    fn count_by_tag(&self, visibility: Visibility) -> Result<TagCounts, AggregationError>;
}

const COUNT_ALL_SQL: &str = "
    SELECT ct.tag_id, COUNT(*)
    FROM content_tags ct
    JOIN content_items c ON c.id = ct.content_id
    GROUP BY ct.tag_id";

const COUNT_PUBLIC_SQL: &str = "
    SELECT ct.tag_id, COUNT(*)
    FROM content_tags ct
    JOIN content_items c ON c.id = ct.content_id
    WHERE c.state = ?1 AND c.public = 1
    GROUP BY ct.tag_id";

impl CountAggregator for SqliteStore {
    fn count_by_tag(&self, visibility: Visibility) -> Result<TagCounts, AggregationError> {
        let conn = self.conn();

        // One grouped query regardless of how many tags exist.
        let counts = match visibility {
            Visibility::All => {
                let mut stmt = conn.prepare_cached(COUNT_ALL_SQL)?;
                stmt.query_map([], |row| Ok((row.get(0)?, row.get::<_, u64>(1)?)))?
                    .collect::<Result<TagCounts, _>>()?
            }
            Visibility::PublicOnly => {
                let mut stmt = conn.prepare_cached(COUNT_PUBLIC_SQL)?;
                stmt.query_map(params![ContentState::Published.as_i64()], |row| {
                    Ok((row.get(0)?, row.get::<_, u64>(1)?))
                })?
                .collect::<Result<TagCounts, _>>()?
            }
        };

        debug!(?visibility, tags = counts.len(), "aggregated tag counts");
        Ok(counts)
    }
}
