//! Feed crawling: failover RPC, paging and resumable sessions
//!
//! This module implements the fetch side of the exporter:
//!
//! - [`node`] - JSON-RPC client rotating across Hive API nodes
//! - [`feed`] - Blog page requests and decoding
//! - [`session`] - Per-user working set, cursor and lifecycle
//! - [`pagination`] - The resumable paging loop merging pages into the cache

pub mod feed;
pub mod node;
pub mod pagination;
pub mod session;

use std::sync::Arc;
use tokio::sync::watch;

pub use feed::{BlogFeed, FeedPage, FeedQuery, FeedSource, BLOG_METHOD};
pub use node::NodeClient;
pub use pagination::{PaginationEngine, SessionOutcome, SessionStatus};
pub use session::{Session, SessionMode, SessionState};

/// Cooperative cancellation flag shared between a session and its caller
///
/// The pagination loop only looks at it between pages, so a request that is
/// already in flight always completes (or times out) and its page is merged.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone of the token, so this cannot fail
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
