//! Local post cache
//!
//! Posts are cached keyed by `permlink` alone and filtered by author at read
//! time. Two authors publishing the same permlink therefore share one record
//! and the last write wins.
//!
//! - [`PostStore`] - the cache contract used by the pagination engine
//! - [`repository::SqlitePostStore`] - durable SQLite implementation
//! - [`repository::InMemoryPostStore`] - in-memory implementation for tests

pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Cursor, Post};
use crate::utils::error::CacheError;

pub use repository::{InMemoryPostStore, SqlitePostStore};

/// Outcome of the most recent session for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLogEntry {
    pub session_id: String,
    pub username: String,
    /// `completed`, `cancelled` or `aborted`
    pub status: String,
    pub cursor: Option<Cursor>,
    /// Posts known for the user when the session ended
    pub post_count: usize,
    /// Posts merged from the feed during the session
    pub new_posts: usize,
    pub finished_at: DateTime<Utc>,
}

/// Durable cache of posts
///
/// Every write is committed before the call returns. Implementations must be
/// safe to share between tasks.
pub trait PostStore: Send + Sync {
    /// Insert or replace the record for `post.permlink`
    fn put(&self, post: &Post) -> Result<(), CacheError>;

    /// All posts whose author equals `username` exactly (case-sensitive)
    fn get_by_owner(&self, username: &str) -> Result<Vec<Post>, CacheError>;

    /// Remove every cached post and session log, for all users
    fn clear(&self) -> Result<(), CacheError>;

    /// Number of cached posts across all users
    fn count(&self) -> Result<usize, CacheError>;

    /// Record the outcome of a session, replacing the previous one for the user
    fn save_session_log(&self, entry: &SessionLogEntry) -> Result<(), CacheError>;

    /// Outcome of the last session for `username`
    fn load_session_log(&self, username: &str) -> Result<Option<SessionLogEntry>, CacheError>;

    /// Forget the last session for `username`
    fn discard_session_log(&self, username: &str) -> Result<(), CacheError>;
}
