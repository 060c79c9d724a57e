//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use hive_exporter::crawler::{CancelToken, FeedPage, FeedQuery, FeedSource};
use hive_exporter::models::Post;
use hive_exporter::utils::error::RpcError;

/// Create a post published `n` hours after a fixed epoch
pub fn create_post(author: &str, n: i64) -> Post {
    let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    let mut post = Post::new(author, &format!("{author}-post-{n}"), base + Duration::hours(n));
    post.title = format!("Post {n} by {author}");
    post.body = format!("Body of post {n}");
    post.json_metadata = r#"{"tags":["hive","test"],"app":"peakd/2023.1"}"#.to_string();
    post
}

/// An author's blog of `count` posts, newest first
pub fn create_blog(author: &str, count: i64) -> Vec<Post> {
    (1..=count).rev().map(|n| create_post(author, n)).collect()
}

/// Insert a reblog by `other` after every `every` items
pub fn with_reblogs(blog: Vec<Post>, other: &str, every: usize) -> Vec<Post> {
    let mut out = Vec::new();
    for (i, post) in blog.into_iter().enumerate() {
        let hours = (post.created - Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()).num_hours();
        out.push(post);
        if (i + 1) % every == 0 {
            out.push(create_post(other, hours * 100));
        }
    }
    out
}

/// Raw JSON of a post as a node would send it
pub fn post_json(post: &Post) -> Value {
    let mut value = serde_json::to_value(post).unwrap();
    value["net_votes"] = json!(3);
    value["category"] = json!("hive");
    value
}

/// How a fake feed treats the start item of a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartItem {
    /// The page begins with the start item, as Hive nodes do
    Included,
    /// The page begins right after the start item
    Excluded,
}

/// In-memory blog feed
pub struct FakeFeed {
    blog: Vec<Post>,
    start_item: StartItem,
    calls: AtomicUsize,
    queries: Mutex<Vec<FeedQuery>>,
    cancel_after: Option<(usize, CancelToken)>,
    fail_after: Option<usize>,
}

impl FakeFeed {
    pub fn new(blog: Vec<Post>, start_item: StartItem) -> Self {
        Self {
            blog,
            start_item,
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
            cancel_after: None,
            fail_after: None,
        }
    }

    /// Cancel `token` once `calls` pages have been served
    pub fn cancel_after(mut self, calls: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    /// Fail every call after the first `calls`
    pub fn fail_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch_page(&self, query: &FeedQuery) -> Result<FeedPage, RpcError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().unwrap().push(query.clone());

        if self.fail_after.is_some_and(|n| call > n) {
            return Err(RpcError::AllNodesExhausted {
                attempts: 3,
                last_error: "Request timeout".to_string(),
            });
        }

        let from = match &query.start {
            None => 0,
            Some(cursor) => match self
                .blog
                .iter()
                .position(|p| p.author == cursor.author && p.permlink == cursor.permlink)
            {
                Some(i) if self.start_item == StartItem::Included => i,
                Some(i) => i + 1,
                None => self.blog.len(),
            },
        };

        let posts = self.blog[from..].iter().take(query.limit).cloned().collect();

        if let Some((n, token)) = &self.cancel_after {
            if call == *n {
                token.cancel();
            }
        }

        Ok(FeedPage::from_posts(posts))
    }
}
