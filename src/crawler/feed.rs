//! Blog feed access
//!
//! The pagination engine talks to the remote feed through [`FeedSource`] so
//! it can be driven by the real Hive API ([`BlogFeed`]) or by a fake in tests.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::crawler::node::NodeClient;
use crate::models::{Cursor, Post};
use crate::utils::error::RpcError;

/// Remote method returning an author's blog, newest first
pub const BLOG_METHOD: &str = "condenser_api.get_discussions_by_blog";

/// Parameters of one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Blog owner
    pub tag: String,

    /// Maximum number of posts in the page
    pub limit: usize,

    /// Item the page starts from; `None` starts from the newest post
    pub start: Option<Cursor>,
}

impl FeedQuery {
    pub fn new(tag: &str, limit: usize, start: Option<Cursor>) -> Self {
        Self {
            tag: tag.to_string(),
            limit,
            start,
        }
    }

    /// Positional RPC params: `[{tag, limit, start_author?, start_permlink?}]`
    pub fn to_params(&self) -> Value {
        let mut query = Map::new();
        query.insert("tag".to_string(), json!(self.tag));
        query.insert("limit".to_string(), json!(self.limit));

        if let Some(start) = &self.start {
            query.insert("start_author".to_string(), json!(start.author));
            query.insert("start_permlink".to_string(), json!(start.permlink));
        }

        Value::Array(vec![Value::Object(query)])
    }
}

/// One page of the remote feed
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Posts that decoded cleanly, in received order
    pub posts: Vec<Post>,

    /// Number of items the node returned, including undecodable ones
    pub received: usize,

    /// `(author, permlink)` of the last item returned, decodable or not
    pub last_item: Option<Cursor>,
}

impl FeedPage {
    /// Page whose every item decoded
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let received = posts.len();
        let last_item = posts.last().map(Cursor::from_post);
        Self {
            posts,
            received,
            last_item,
        }
    }

    /// Decode a raw `result`; `null` counts as an empty page
    ///
    /// Items that do not decode as a post are skipped with a warning, they
    /// still count towards `received`. The last item only needs `author` and
    /// `permlink` to name the next page.
    pub fn decode(result: Value) -> Result<Self, RpcError> {
        let items = match result {
            Value::Null => return Ok(Self::default()),
            Value::Array(items) => items,
            other => {
                return Err(RpcError::Decode(format!(
                    "expected an array of posts, got {}",
                    type_name(&other)
                )))
            }
        };

        let received = items.len();
        let last_item = items
            .last()
            .and_then(|item| serde_json::from_value::<Cursor>(item.clone()).ok());

        let posts = items
            .into_iter()
            .enumerate()
            .filter_map(|(i, item)| match serde_json::from_value::<Post>(item) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!(index = i, error = %e, "Skipping undecodable feed item");
                    None
                }
            })
            .collect();

        Ok(Self {
            posts,
            received,
            last_item,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.received == 0
    }

    /// Cursor naming the last item of the page as received
    pub fn last_cursor(&self) -> Option<Cursor> {
        self.last_item.clone()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Source of blog pages
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch one page
    async fn fetch_page(&self, query: &FeedQuery) -> Result<FeedPage, RpcError>;
}

/// [`FeedSource`] backed by the Hive API
pub struct BlogFeed {
    client: NodeClient,
}

impl BlogFeed {
    pub fn new(client: NodeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedSource for BlogFeed {
    async fn fetch_page(&self, query: &FeedQuery) -> Result<FeedPage, RpcError> {
        tracing::debug!(
            tag = %query.tag,
            limit = query.limit,
            start = ?query.start,
            "Requesting blog page"
        );

        let result = self.client.call(BLOG_METHOD, query.to_params()).await?;
        FeedPage::decode(result)
    }
}
