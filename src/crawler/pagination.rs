//! Resumable blog pagination with cache merge
//!
//! This module walks an author's blog newest to oldest, one page at a time,
//! merging every new post into the local cache before it joins the session's
//! working set.
//!
//! # Stop conditions
//!
//! - the node returns an empty page
//! - the page is shorter than the configured page size
//! - the page ends on the item the cursor already points at
//! - the caller cancels (checked between pages only)
//! - every RPC node fails (the session aborts, cached progress is kept)
//! - a full page ends on an item without `author` or `permlink`, so the next
//!   page cannot be named (the session aborts)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::PaginationConfig;
use crate::crawler::feed::{FeedPage, FeedQuery, FeedSource};
use crate::crawler::session::{Session, SessionMode, SessionState};
use crate::crawler::CancelToken;
use crate::error::{Error, Result};
use crate::models::{Cursor, Post};
use crate::storage::{PostStore, SessionLogEntry};
use crate::utils::error::RpcError;

/// How a session ended
#[derive(Debug)]
pub enum SessionStatus {
    /// The feed was walked to its end
    Completed,
    /// The caller cancelled between two pages
    Cancelled,
    /// A page request or cache write failed
    Aborted(Error),
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// Result of one session: the posts known for the user and how paging ended
///
/// Partial sessions still carry every post merged so far; those posts are
/// already in the cache.
#[derive(Debug)]
pub struct SessionOutcome {
    pub username: String,
    /// Newest first when completed, merge order otherwise
    pub posts: Vec<Post>,
    pub status: SessionStatus,
    /// Posts that came from the cache at session start
    pub cached_posts: usize,
    /// Posts merged from the remote feed during this session
    pub new_posts: usize,
    /// Page requests that returned
    pub pages_fetched: usize,
    /// Cursor at the time the session stopped
    pub cursor: Option<Cursor>,
}

impl SessionOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self.status, SessionStatus::Completed)
    }

    pub fn is_partial(&self) -> bool {
        !self.is_complete()
    }

    /// The error that aborted the session, if any
    pub fn error(&self) -> Option<&Error> {
        match &self.status {
            SessionStatus::Aborted(e) => Some(e),
            _ => None,
        }
    }
}

/// Why the paging loop stopped on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    EmptyPage,
    ShortPage,
    StalledCursor,
}

/// Drives sessions against a feed and a post cache
pub struct PaginationEngine {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn PostStore>,
    page_size: usize,
    batch_delay: Duration,
}

impl PaginationEngine {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn PostStore>,
        config: &PaginationConfig,
    ) -> Self {
        Self {
            feed,
            store,
            page_size: config.page_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Run one session for `username`
    ///
    /// Failures while paging do not return `Err`: they end the session with
    /// [`SessionStatus::Aborted`] and the partial working set.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUserInput` for an empty username, before any
    /// cache or network access, and `Error::Cache` if the cache cannot be read.
    pub async fn run(
        &self,
        username: &str,
        mode: SessionMode,
        cancel: &CancelToken,
    ) -> Result<SessionOutcome> {
        let mut session = Session::new(username)?;
        let session_id = uuid::Uuid::new_v4().to_string();

        session.transition(SessionState::Loading)?;
        let cached = self.store.get_by_owner(session.username())?;
        let cached_posts = session.load(cached);

        match mode {
            SessionMode::Continuation => {
                let cursor = session.resume_cursor();
                if let Some(cursor) = &cursor {
                    tracing::info!(
                        username = %session.username(),
                        cursor = %cursor,
                        "Resuming from oldest cached post"
                    );
                }
                session.set_cursor(cursor);
            }
            SessionMode::Fresh => {
                tracing::info!(username = %session.username(), "Starting fresh scan");
                self.store.discard_session_log(session.username())?;
                session.set_cursor(None);
            }
        }

        tracing::info!(
            username = %session.username(),
            cached = cached_posts,
            session_id = %session_id,
            "Loaded posts from cache"
        );

        session.transition(SessionState::Paging)?;
        let (status, pages_fetched) = self.page(&mut session, cancel).await;

        let new_posts = session.len() - cached_posts;
        match &status {
            SessionStatus::Completed => {
                session.transition(SessionState::Completed)?;
                session.sort_newest_first();
                tracing::info!(
                    username = %session.username(),
                    total = session.len(),
                    new = new_posts,
                    pages = pages_fetched,
                    "Scan completed"
                );
            }
            SessionStatus::Cancelled => {
                session.transition(SessionState::Stopping)?;
                tracing::warn!(
                    username = %session.username(),
                    total = session.len(),
                    "Scan cancelled, partial result kept in cache"
                );
            }
            SessionStatus::Aborted(e) => {
                session.transition(SessionState::Stopping)?;
                tracing::error!(
                    username = %session.username(),
                    total = session.len(),
                    error = %e,
                    "Scan aborted, partial result kept in cache"
                );
            }
        }

        let entry = SessionLogEntry {
            session_id,
            username: session.username().to_string(),
            status: status.as_str().to_string(),
            cursor: session.cursor().cloned(),
            post_count: session.len(),
            new_posts,
            finished_at: Utc::now(),
        };
        if let Err(e) = self.store.save_session_log(&entry) {
            tracing::warn!(username = %entry.username, error = %e, "Failed to record session log");
        }

        session.transition(SessionState::Idle)?;
        let cursor = session.cursor().cloned();

        Ok(SessionOutcome {
            username: session.username().to_string(),
            posts: session.into_posts(),
            status,
            cached_posts,
            new_posts,
            pages_fetched,
            cursor,
        })
    }

    /// The paging loop; returns the final status and the number of pages fetched
    async fn page(&self, session: &mut Session, cancel: &CancelToken) -> (SessionStatus, usize) {
        let mut pages = 0;

        loop {
            if cancel.is_cancelled() {
                return (SessionStatus::Cancelled, pages);
            }

            let query = FeedQuery::new(
                session.username(),
                self.page_size,
                session.cursor().cloned(),
            );
            let page = match self.feed.fetch_page(&query).await {
                Ok(page) => page,
                Err(e) => return (SessionStatus::Aborted(e.into()), pages),
            };
            pages += 1;

            if page.is_empty() {
                self.log_stop(session, StopReason::EmptyPage, pages);
                return (SessionStatus::Completed, pages);
            }

            let merged = match self.merge_page(session, &page) {
                Ok(merged) => merged,
                Err(e) => return (SessionStatus::Aborted(e), pages),
            };

            tracing::info!(
                username = %session.username(),
                page = pages,
                received = page.received,
                merged,
                total = session.len(),
                "Page processed"
            );

            match self.next_cursor(session, &page) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    self.log_stop(session, reason, pages);
                    return (SessionStatus::Completed, pages);
                }
                Err(e) => return (SessionStatus::Aborted(e.into()), pages),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.batch_delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    /// Merge a page into the cache and the working set, in received order
    ///
    /// Each accepted post is written to the cache before it joins the working
    /// set. Returns how many posts were added.
    fn merge_page(&self, session: &mut Session, page: &FeedPage) -> Result<usize> {
        let mut merged = 0;

        for post in &page.posts {
            if !session.accepts(post) {
                tracing::trace!(author = %post.author, permlink = %post.permlink, "Skipping post");
                continue;
            }

            self.store.put(post)?;
            session.insert(post.clone());
            merged += 1;
        }

        Ok(merged)
    }

    /// Advance the cursor to the last item of `page`, or say why paging is over
    ///
    /// The last item counts even when it did not decode as a post.
    fn next_cursor(
        &self,
        session: &mut Session,
        page: &FeedPage,
    ) -> std::result::Result<Option<StopReason>, RpcError> {
        if page.received < self.page_size {
            return Ok(Some(StopReason::ShortPage));
        }

        let Some(last) = page.last_cursor() else {
            return Err(RpcError::Decode(
                "last item of a full page has no author/permlink".to_string(),
            ));
        };

        if session
            .cursor()
            .is_some_and(|current| current.permlink == last.permlink)
        {
            return Ok(Some(StopReason::StalledCursor));
        }

        session.set_cursor(Some(last));
        Ok(None)
    }

    fn log_stop(&self, session: &Session, reason: StopReason, pages: usize) {
        tracing::debug!(
            username = %session.username(),
            reason = ?reason,
            pages,
            "Feed exhausted"
        );
    }
}
