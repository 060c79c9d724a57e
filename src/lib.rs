//! hive-exporter - Hive blog archiver
//!
//! Fetches an author's complete blog history from the Hive JSON-RPC API,
//! caches it locally and exports it to files.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`crawler`] - Failover RPC client, feed paging and resumable sessions
//! - [`models`] - Core data structures and types
//! - [`storage`] - Local post cache (SQLite)
//! - [`export`] - Directory, JSON and text writers
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hive_exporter::config::Config;
//! use hive_exporter::crawler::{BlogFeed, CancelToken, NodeClient, PaginationEngine, SessionMode};
//! use hive_exporter::storage::SqlitePostStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = NodeClient::from_config(&config.rpc)?;
//!     let store = Arc::new(SqlitePostStore::new(&config.cache.sqlite_path)?);
//!     let feed = Arc::new(BlogFeed::new(client));
//!     let engine = PaginationEngine::new(feed, store, &config.pagination);
//!
//!     let outcome = engine.run("alice", SessionMode::Fresh, &CancelToken::new()).await?;
//!     println!("{} posts", outcome.posts.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod export;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{
        BlogFeed, CancelToken, FeedSource, NodeClient, PaginationEngine, SessionMode,
        SessionOutcome, SessionStatus,
    };
    pub use crate::error::{Error, ErrorCategory, ExporterErrorTrait, Result};
    pub use crate::export::{ExportFormat, ExportRange, ExportReport, Exporter};
    pub use crate::models::{Cursor, Post, PostMetadata};
    pub use crate::storage::{PostStore, SqlitePostStore};
}

// Direct re-exports for convenience
pub use models::{Cursor, Post};
