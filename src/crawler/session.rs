//! Per-user fetch session
//!
//! A [`Session`] owns everything the pagination loop mutates: the working set
//! of known posts, the cursor and the lifecycle state. It is created per run
//! and never shared, so none of it is locked.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::models::{normalize_username, sort_newest_first, Cursor, Post};

/// How a session picks its starting point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Start from the newest post and discard the previous session log
    Fresh,
    /// Resume from the oldest cached post
    Continuation,
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Paging,
    Stopping,
    Completed,
}

impl SessionState {
    /// Allowed transitions: `Idle → Loading → Paging → (Stopping | Completed) → Idle`
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Paging)
                | (Loading, Stopping)
                | (Paging, Stopping)
                | (Paging, Completed)
                | (Stopping, Idle)
                | (Completed, Idle)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Paging => "paging",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working state of one fetch run for one user
#[derive(Debug)]
pub struct Session {
    username: String,
    working_set: Vec<Post>,
    known: HashSet<String>,
    cursor: Option<Cursor>,
    state: SessionState,
}

impl Session {
    /// Create an idle session; the username is trimmed and lowercased
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUserInput` for an empty username
    pub fn new(username: &str) -> Result<Self> {
        Ok(Self {
            username: normalize_username(username)?,
            working_set: Vec::new(),
            known: HashSet::new(),
            cursor: None,
            state: SessionState::Idle,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn posts(&self) -> &[Post] {
        &self.working_set
    }

    pub fn len(&self) -> usize {
        self.working_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.working_set.is_empty()
    }

    /// Move to `next`, rejecting transitions outside the lifecycle
    pub fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::other(format!(
                "invalid session transition {} -> {next}",
                self.state
            )));
        }

        tracing::trace!(
            username = %self.username,
            from = %self.state,
            to = %next,
            "Session transition"
        );
        self.state = next;
        Ok(())
    }

    /// Whether `post` belongs in the working set: right author, unseen permlink
    pub fn accepts(&self, post: &Post) -> bool {
        post.author == self.username && !self.known.contains(&post.permlink)
    }

    /// Add `post` if accepted, returning whether it was added
    pub fn insert(&mut self, post: Post) -> bool {
        if !self.accepts(&post) {
            return false;
        }
        self.known.insert(post.permlink.clone());
        self.working_set.push(post);
        true
    }

    /// Seed the working set from cached posts
    ///
    /// Returns how many posts were accepted.
    pub fn load(&mut self, cached: Vec<Post>) -> usize {
        let mut added = 0;
        for post in cached {
            if self.insert(post) {
                added += 1;
            }
        }
        added
    }

    /// Oldest post of the working set, where a continuation resumes from
    pub fn resume_cursor(&self) -> Option<Cursor> {
        self.working_set
            .iter()
            .min_by(|a, b| {
                a.created
                    .cmp(&b.created)
                    .then_with(|| a.permlink.cmp(&b.permlink))
            })
            .map(Cursor::from_post)
    }

    pub fn set_cursor(&mut self, cursor: Option<Cursor>) {
        self.cursor = cursor;
    }

    /// Order the working set newest first
    pub fn sort_newest_first(&mut self) {
        sort_newest_first(&mut self.working_set);
    }

    /// Consume the session, yielding the working set
    pub fn into_posts(self) -> Vec<Post> {
        self.working_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn post(author: &str, permlink: &str, day: u32) -> Post {
        Post::new(
            author,
            permlink,
            Utc.with_ymd_and_hms(2023, 3, day, 8, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_invalid_username() {
        assert!(matches!(Session::new(""), Err(Error::InvalidUserInput(_))));
        assert!(matches!(Session::new("  \t"), Err(Error::InvalidUserInput(_))));
    }

    #[test]
    fn test_username_is_normalized() {
        let session = Session::new(" Alice ").unwrap();
        assert_eq!(session.username(), "alice");
    }

    #[test]
    fn test_author_filtering() {
        let mut session = Session::new("alice").unwrap();
        assert!(session.insert(post("alice", "mine", 1)));
        assert!(!session.insert(post("bob", "reblog", 2)));
        assert!(!session.insert(post("Alice", "case", 3)));

        assert_eq!(session.len(), 1);
        assert!(session.posts().iter().all(|p| p.author == "alice"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let batch = vec![post("alice", "a", 1), post("alice", "b", 2), post("alice", "a", 1)];

        let mut session = Session::new("alice").unwrap();
        session.load(batch.clone());
        let once: Vec<_> = session.posts().to_vec();

        session.load(batch);
        assert_eq!(session.posts(), once.as_slice());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_resume_cursor_is_oldest() {
        let mut session = Session::new("alice").unwrap();
        session.load(vec![
            post("alice", "d2", 2),
            post("alice", "d3", 3),
            post("alice", "d1", 1),
        ]);

        assert_eq!(session.resume_cursor(), Some(Cursor::new("alice", "d1")));
    }

    #[test]
    fn test_resume_cursor_empty() {
        let session = Session::new("alice").unwrap();
        assert!(session.resume_cursor().is_none());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let mut session = Session::new("alice").unwrap();
        assert!(session.transition(SessionState::Paging).is_err());

        session.transition(SessionState::Loading).unwrap();
        session.transition(SessionState::Paging).unwrap();
        session.transition(SessionState::Completed).unwrap();
        assert!(session.transition(SessionState::Stopping).is_err());
        session.transition(SessionState::Idle).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut session = Session::new("alice").unwrap();
        session.load(vec![post("alice", "a", 1), post("alice", "c", 3), post("alice", "b", 2)]);
        session.sort_newest_first();

        let order: Vec<_> = session.posts().iter().map(|p| p.permlink.as_str()).collect();
        assert_eq!(order, ["c", "b", "a"]);
    }

    proptest! {
        #[test]
        fn prop_merge_twice_equals_once(
            entries in proptest::collection::vec(("[ab]", "[a-e]{1,2}", 1u32..28), 0..40)
        ) {
            let batch: Vec<Post> = entries
                .iter()
                .map(|(author, permlink, day)| post(author, permlink, *day))
                .collect();

            let mut once = Session::new("a").unwrap();
            once.load(batch.clone());

            let mut twice = Session::new("a").unwrap();
            twice.load(batch.clone());
            twice.load(batch);

            prop_assert_eq!(once.posts(), twice.posts());

            let unique: HashSet<_> = twice.posts().iter().map(|p| p.permlink.clone()).collect();
            prop_assert_eq!(unique.len(), twice.len());
        }
    }
}
