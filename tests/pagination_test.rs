//! Integration tests for the pagination engine over fake feeds

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{create_blog, with_reblogs, FakeFeed, StartItem};
use hive_exporter::config::PaginationConfig;
use hive_exporter::crawler::{CancelToken, PaginationEngine, SessionMode, SessionStatus};
use hive_exporter::models::Cursor;
use hive_exporter::storage::{InMemoryPostStore, PostStore, SqlitePostStore};
use tempfile::TempDir;

fn pagination(page_size: usize) -> PaginationConfig {
    PaginationConfig {
        page_size,
        batch_delay_ms: 0,
    }
}

fn engine(feed: Arc<FakeFeed>, store: Arc<dyn PostStore>) -> PaginationEngine {
    PaginationEngine::new(feed, store, &pagination(20))
}

fn permlinks(posts: &[hive_exporter::Post]) -> Vec<String> {
    posts.iter().map(|p| p.permlink.clone()).collect()
}

/// 45 posts at 20 per page take three requests: 20, 20 and a short page of 5
#[tokio::test]
async fn test_full_scan_pages_to_the_end() {
    let feed = Arc::new(FakeFeed::new(create_blog("alice", 45), StartItem::Excluded));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed.clone(), store.clone())
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(feed.calls(), 3);
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.posts.len(), 45);
    assert_eq!(outcome.new_posts, 45);
    assert_eq!(store.get_by_owner("alice").unwrap().len(), 45);

    // Newest first
    assert_eq!(outcome.posts[0].permlink, "alice-post-45");
    assert_eq!(outcome.posts[44].permlink, "alice-post-1");
    assert!(outcome
        .posts
        .windows(2)
        .all(|w| w[0].created >= w[1].created));
}

/// Hive repeats the start item at the top of the next page; it is merged once
#[tokio::test]
async fn test_repeated_start_item_is_not_duplicated() {
    let feed = Arc::new(FakeFeed::new(create_blog("alice", 45), StartItem::Included));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed.clone(), store.clone())
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(feed.calls(), 3);
    assert_eq!(outcome.posts.len(), 45);

    let unique: HashSet<_> = permlinks(&outcome.posts).into_iter().collect();
    assert_eq!(unique.len(), 45);

    let queries = feed.queries();
    assert_eq!(queries[0].start, None);
    assert_eq!(queries[1].start, Some(Cursor::new("alice", "alice-post-26")));
    assert_eq!(queries[2].start, Some(Cursor::new("alice", "alice-post-7")));
}

#[tokio::test]
async fn test_reblogs_are_filtered_out() {
    let blog = with_reblogs(create_blog("alice", 30), "bob", 4);
    let feed = Arc::new(FakeFeed::new(blog, StartItem::Included));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed, store.clone())
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.posts.len(), 30);
    assert!(outcome.posts.iter().all(|p| p.author == "alice"));
    assert!(store.get_by_owner("bob").unwrap().is_empty());
    assert_eq!(store.count().unwrap(), 30);
}

#[tokio::test]
async fn test_username_is_normalized_before_filtering() {
    let feed = Arc::new(FakeFeed::new(create_blog("alice", 5), StartItem::Included));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed.clone(), store)
        .run("  ALICE ", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.username, "alice");
    assert_eq!(outcome.posts.len(), 5);
    assert_eq!(feed.queries()[0].tag, "alice");
}

#[tokio::test]
async fn test_empty_blog_completes_after_one_request() {
    let feed = Arc::new(FakeFeed::new(Vec::new(), StartItem::Included));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed.clone(), store)
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(feed.calls(), 1);
    assert!(outcome.posts.is_empty());
}

/// A cancelled session keeps its pages in the cache and a continuation
/// picks up from the oldest cached post
#[tokio::test]
async fn test_cancel_then_resume_from_durable_cache() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("cache.db");

    let cancel = CancelToken::new();
    {
        let feed = Arc::new(
            FakeFeed::new(create_blog("alice", 45), StartItem::Included)
                .cancel_after(1, cancel.clone()),
        );
        let store = Arc::new(SqlitePostStore::new(&db).unwrap());

        let outcome = engine(feed.clone(), store.clone())
            .run("alice", SessionMode::Fresh, &cancel)
            .await
            .unwrap();

        assert!(matches!(outcome.status, SessionStatus::Cancelled));
        assert_eq!(feed.calls(), 1);
        assert_eq!(outcome.posts.len(), 20);

        let log = store.load_session_log("alice").unwrap().unwrap();
        assert_eq!(log.status, "cancelled");
        assert_eq!(log.post_count, 20);
    }

    // Process restart: a new store over the same file
    let store = Arc::new(SqlitePostStore::new(&db).unwrap());
    assert_eq!(store.get_by_owner("alice").unwrap().len(), 20);

    let feed = Arc::new(FakeFeed::new(create_blog("alice", 45), StartItem::Included));
    let outcome = engine(feed.clone(), store.clone())
        .run("alice", SessionMode::Continuation, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.cached_posts, 20);
    assert_eq!(outcome.new_posts, 25);
    assert_eq!(outcome.posts.len(), 45);
    assert_eq!(
        feed.queries()[0].start,
        Some(Cursor::new("alice", "alice-post-26"))
    );
    assert_eq!(feed.calls(), 2);
    assert_eq!(store.get_by_owner("alice").unwrap().len(), 45);

    let log = store.load_session_log("alice").unwrap().unwrap();
    assert_eq!(log.status, "completed");
}

/// A fresh session after a partial one still starts from the newest post
#[tokio::test]
async fn test_fresh_session_ignores_partial_progress() {
    let store = Arc::new(InMemoryPostStore::new());

    let cancel = CancelToken::new();
    let feed = Arc::new(
        FakeFeed::new(create_blog("alice", 45), StartItem::Included)
            .cancel_after(1, cancel.clone()),
    );
    engine(feed, store.clone())
        .run("alice", SessionMode::Fresh, &cancel)
        .await
        .unwrap();

    let feed = Arc::new(FakeFeed::new(create_blog("alice", 45), StartItem::Included));
    let outcome = engine(feed.clone(), store.clone())
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(feed.queries()[0].start, None);
    assert_eq!(outcome.cached_posts, 20);
    assert_eq!(outcome.posts.len(), 45);
    assert_eq!(permlinks(&outcome.posts)[0], "alice-post-45");
}

#[tokio::test]
async fn test_node_exhaustion_keeps_merged_pages() {
    let feed = Arc::new(FakeFeed::new(create_blog("alice", 45), StartItem::Included).fail_after(1));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed, store.clone())
        .run("alice", SessionMode::Fresh, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_partial());
    assert!(outcome.error().is_some());
    assert_eq!(outcome.posts.len(), 20);
    assert_eq!(store.get_by_owner("alice").unwrap().len(), 20);
    assert_eq!(outcome.cursor, Some(Cursor::new("alice", "alice-post-26")));
}

#[tokio::test]
async fn test_continuation_with_empty_cache_starts_from_newest() {
    let feed = Arc::new(FakeFeed::new(create_blog("alice", 3), StartItem::Included));
    let store = Arc::new(InMemoryPostStore::new());

    let outcome = engine(feed.clone(), store)
        .run("alice", SessionMode::Continuation, &CancelToken::new())
        .await
        .unwrap();

    assert!(outcome.is_complete());
    assert_eq!(feed.queries()[0].start, None);
    assert_eq!(outcome.posts.len(), 3);
}
