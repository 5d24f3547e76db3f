//! SQLite-backed tag store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use tracing::info;

use crate::error::StoreError;
use crate::store::TagStore;
use crate::types::{
    NewContentItem, NewTag, Pagination, Tag, TagFilter, TagId, TagPage, TagPatch,
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const TAG_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

const DELETE_CHUNK: usize = 500;

const KEYWORD_CLAUSE: &str =
    "WHERE regexp(?1, name) OR regexp(?1, slug) OR regexp(?1, description)";

/// SQLite store holding tags and the content collection they are counted against.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the SQLite database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self::init(conn)?;
        info!(path = %path.display(), "tag database initialized");
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS content_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                state INTEGER NOT NULL,
                public INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_content_visibility ON content_items(state, public);

            CREATE TABLE IF NOT EXISTS content_tags (
                content_id INTEGER NOT NULL REFERENCES content_items(id) ON DELETE CASCADE,
                tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (content_id, tag_id)
            );
            CREATE INDEX IF NOT EXISTS idx_content_tags_tag ON content_tags(tag_id);
            ",
        )?;
        register_regexp(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection. A panic while holding the lock leaves no partial
    /// SQL state behind, so a poisoned lock is still usable.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a content item and its tag memberships. Returns the new item id.
    pub fn insert_content(&self, item: &NewContentItem) -> Result<i64, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO content_items (title, state, public, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![item.title, item.state.as_i64(), item.public, Utc::now()],
        )?;
        let content_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO content_tags (content_id, tag_id) VALUES (?1, ?2)",
            )?;
            for tag_id in &item.tags {
                stmt.execute(params![content_id, tag_id])?;
            }
        }
        tx.commit()?;
        Ok(content_id)
    }
}

impl TagStore for SqliteStore {
    fn query(&self, filter: &TagFilter, pagination: &Pagination) -> Result<TagPage, StoreError> {
        if let Some(keyword) = &filter.keyword {
            Regex::new(keyword).map_err(|e| StoreError::InvalidPattern(e.to_string()))?;
        }

        let where_clause = if filter.keyword.is_some() {
            KEYWORD_CLAUSE
        } else {
            ""
        };
        let keyword_params: Vec<&str> = filter.keyword.as_deref().into_iter().collect();
        let limit_idx = keyword_params.len() + 1;

        let conn = self.conn();

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tags {where_clause}"),
            params_from_iter(keyword_params.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {TAG_COLUMNS} FROM tags {where_clause} ORDER BY id DESC LIMIT ?{} OFFSET ?{}",
            limit_idx,
            limit_idx + 1
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = keyword_params
            .iter()
            .map(|k| Box::new(k.to_string()) as Box<dyn rusqlite::ToSql>)
            .collect();
        bound.push(Box::new(i64::from(pagination.limit)));
        bound.push(Box::new(
            i64::try_from(pagination.offset()).unwrap_or(i64::MAX),
        ));

        let items = stmt
            .query_map(params_from_iter(bound.iter()), tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TagPage::new(items, total, pagination))
    }

    fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, StoreError> {
        let conn = self.conn();
        let tag = conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE slug = ?1"),
                params![slug],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn find_by_id(&self, id: TagId) -> Result<Option<Tag>, StoreError> {
        let conn = self.conn();
        let tag = conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1"),
                params![id],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    fn all(&self) -> Result<Vec<Tag>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY id DESC"))?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn insert(&self, tag: &NewTag) -> Result<Tag, StoreError> {
        let now = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tags (name, slug, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![
                tag.name.as_deref().unwrap_or_default(),
                tag.slug.as_deref().unwrap_or_default(),
                tag.description.as_deref().unwrap_or_default(),
                now,
            ],
        )
        .map_err(map_write_error)?;

        Ok(Tag {
            id: conn.last_insert_rowid(),
            name: tag.name.clone().unwrap_or_default(),
            slug: tag.slug.clone().unwrap_or_default(),
            description: tag.description.clone().unwrap_or_default(),
            count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn update_by_id(&self, id: TagId, patch: &TagPatch) -> Result<Option<Tag>, StoreError> {
        let conn = self.conn();
        let tag = conn
            .query_row(
                &format!(
                    "UPDATE tags SET
                        name = COALESCE(?2, name),
                        slug = COALESCE(?3, slug),
                        description = COALESCE(?4, description),
                        updated_at = ?5
                     WHERE id = ?1
                     RETURNING {TAG_COLUMNS}"
                ),
                params![id, patch.name, patch.slug, patch.description, Utc::now()],
                tag_from_row,
            )
            .optional()
            .map_err(map_write_error)?;
        Ok(tag)
    }

    fn delete_by_id(&self, id: TagId) -> Result<u64, StoreError> {
        let conn = self.conn();
        let deleted = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(deleted as u64)
    }

    fn delete_by_ids(&self, ids: &[TagId]) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut deleted = 0;
        // Stay under SQLite's bound-variable limit.
        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            deleted += tx.execute(
                &format!("DELETE FROM tags WHERE id IN ({placeholders})"),
                params_from_iter(chunk.iter()),
            )?;
        }
        tx.commit()?;
        Ok(deleted as u64)
    }
}

fn tag_from_row(row: &Row<'_>) -> Result<Tag, rusqlite::Error> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
        count: 0,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Translate unique-constraint failures into [`StoreError::DuplicateKey`].
fn map_write_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err
        && failure.code == ErrorCode::ConstraintViolation
        && let Some(columns) = message.strip_prefix("UNIQUE constraint failed: ")
    {
        let field = columns.rsplit('.').next().unwrap_or(columns).to_string();
        return StoreError::DuplicateKey { field };
    }
    StoreError::Sqlite(err)
}

/// Register `regexp(pattern, text)` backed by the `regex` crate.
///
/// The compiled pattern is cached per statement execution; NULL text never matches.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> = ctx.get_or_create_aux(0, |value| -> Result<_, BoxError> {
                Ok(Regex::new(value.as_str()?)?)
            })?;
            let text: Option<String> = ctx.get(1)?;
            Ok(text.is_some_and(|text| pattern.is_match(&text)))
        },
    )
}
