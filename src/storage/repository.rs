//! Post cache implementations
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             PaginationEngine                │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │              PostStore trait                │
//! └─────────────────────────────────────────────┘
//!            │                      │
//!            ▼                      ▼
//! ┌────────────────────┐  ┌────────────────────┐
//! │  SqlitePostStore   │  │ InMemoryPostStore  │
//! └────────────────────┘  └────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use hive_exporter::storage::{PostStore, SqlitePostStore};
//!
//! let store = SqlitePostStore::new("cache.db")?;
//! store.put(&post)?;
//! let posts = store.get_by_owner("alice")?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{PostStore, SessionLogEntry};
use crate::models::{hive_timestamp, Cursor, Post};
use crate::utils::error::CacheError;

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite-backed post cache
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqlitePostStore {
    conn: Mutex<Connection>,
}

impl SqlitePostStore {
    /// Open (or create) the cache database at `path`
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::Path(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;

        // WAL lets a finished session's writes be read by the next one without blocking
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "Post cache opened");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache lock poisoned")
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        self.conn().execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS posts (
                    permlink TEXT PRIMARY KEY,
                    author TEXT NOT NULL,
                    created TEXT NOT NULL,
                    raw_json TEXT NOT NULL,
                    stored_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_posts_author
                    ON posts(author);

                CREATE TABLE IF NOT EXISTS session_log (
                    username TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL,
                    status TEXT NOT NULL,
                    cursor_author TEXT,
                    cursor_permlink TEXT,
                    post_count INTEGER NOT NULL,
                    new_posts INTEGER NOT NULL,
                    finished_at TEXT NOT NULL
                );
                "#,
        )?;

        Ok(())
    }
}

impl PostStore for SqlitePostStore {
    fn put(&self, post: &Post) -> Result<(), CacheError> {
        let raw_json = serde_json::to_string(post)?;
        let created = post.created.format(hive_timestamp::FORMAT).to_string();
        let now = Utc::now().to_rfc3339();

        self.conn().execute(
            r#"
                INSERT INTO posts (permlink, author, created, raw_json, stored_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(permlink) DO UPDATE SET
                    author = excluded.author,
                    created = excluded.created,
                    raw_json = excluded.raw_json,
                    stored_at = excluded.stored_at
                "#,
            params![post.permlink, post.author, created, raw_json, now],
        )?;

        Ok(())
    }

    fn get_by_owner(&self, username: &str) -> Result<Vec<Post>, CacheError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT permlink, raw_json FROM posts WHERE author = ?1 ORDER BY created DESC",
        )?;

        let rows = stmt.query_map(params![username], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut posts = Vec::new();
        for row in rows {
            let (permlink, raw_json) = row?;
            match serde_json::from_str::<Post>(&raw_json) {
                Ok(post) => posts.push(post),
                Err(e) => {
                    tracing::warn!(
                        permlink = %permlink,
                        error = %e,
                        "Skipping unreadable cache record"
                    );
                }
            }
        }

        Ok(posts)
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.conn()
            .execute_batch("DELETE FROM posts; DELETE FROM session_log;")?;
        tracing::info!("Post cache cleared");
        Ok(())
    }

    fn count(&self) -> Result<usize, CacheError> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn save_session_log(&self, entry: &SessionLogEntry) -> Result<(), CacheError> {
        let (cursor_author, cursor_permlink) = match &entry.cursor {
            Some(c) => (Some(c.author.as_str()), Some(c.permlink.as_str())),
            None => (None, None),
        };

        self.conn().execute(
            r#"
                INSERT INTO session_log (
                    username, session_id, status, cursor_author, cursor_permlink,
                    post_count, new_posts, finished_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(username) DO UPDATE SET
                    session_id = excluded.session_id,
                    status = excluded.status,
                    cursor_author = excluded.cursor_author,
                    cursor_permlink = excluded.cursor_permlink,
                    post_count = excluded.post_count,
                    new_posts = excluded.new_posts,
                    finished_at = excluded.finished_at
                "#,
            params![
                entry.username,
                entry.session_id,
                entry.status,
                cursor_author,
                cursor_permlink,
                entry.post_count as i64,
                entry.new_posts as i64,
                entry.finished_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn load_session_log(&self, username: &str) -> Result<Option<SessionLogEntry>, CacheError> {
        let entry = self
            .conn()
            .query_row(
                r#"
                    SELECT username, session_id, status, cursor_author, cursor_permlink,
                           post_count, new_posts, finished_at
                    FROM session_log WHERE username = ?1
                    "#,
                params![username],
                |row| {
                    let cursor_author: Option<String> = row.get(3)?;
                    let cursor_permlink: Option<String> = row.get(4)?;
                    let finished_at: String = row.get(7)?;

                    Ok(SessionLogEntry {
                        username: row.get(0)?,
                        session_id: row.get(1)?,
                        status: row.get(2)?,
                        cursor: cursor_author
                            .zip(cursor_permlink)
                            .map(|(author, permlink)| Cursor { author, permlink }),
                        post_count: row.get::<_, i64>(5)? as usize,
                        new_posts: row.get::<_, i64>(6)? as usize,
                        finished_at: DateTime::parse_from_rfc3339(&finished_at)
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_default(),
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    fn discard_session_log(&self, username: &str) -> Result<(), CacheError> {
        self.conn()
            .execute("DELETE FROM session_log WHERE username = ?1", params![username])?;
        Ok(())
    }
}

// ============================================================================
// In-Memory Implementation (for testing)
// ============================================================================

/// In-memory implementation of [`PostStore`]
///
/// Same keying rules as the SQLite store, without persistence.
#[derive(Default)]
pub struct InMemoryPostStore {
    posts: RwLock<HashMap<String, Post>>,
    logs: RwLock<HashMap<String, SessionLogEntry>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PostStore for InMemoryPostStore {
    fn put(&self, post: &Post) -> Result<(), CacheError> {
        self.posts
            .write()
            .expect("cache lock poisoned")
            .insert(post.permlink.clone(), post.clone());
        Ok(())
    }

    fn get_by_owner(&self, username: &str) -> Result<Vec<Post>, CacheError> {
        Ok(self
            .posts
            .read()
            .expect("cache lock poisoned")
            .values()
            .filter(|p| p.author == username)
            .cloned()
            .collect())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.posts.write().expect("cache lock poisoned").clear();
        self.logs.write().expect("cache lock poisoned").clear();
        Ok(())
    }

    fn count(&self) -> Result<usize, CacheError> {
        Ok(self.len())
    }

    fn save_session_log(&self, entry: &SessionLogEntry) -> Result<(), CacheError> {
        self.logs
            .write()
            .expect("cache lock poisoned")
            .insert(entry.username.clone(), entry.clone());
        Ok(())
    }

    fn load_session_log(&self, username: &str) -> Result<Option<SessionLogEntry>, CacheError> {
        Ok(self
            .logs
            .read()
            .expect("cache lock poisoned")
            .get(username)
            .cloned())
    }

    fn discard_session_log(&self, username: &str) -> Result<(), CacheError> {
        self.logs.write().expect("cache lock poisoned").remove(username);
        Ok(())
    }
}
