//! Bounded worker pool over independent items
//!
//! Runs at most `concurrency` futures at a time. Each item produces its own
//! output, so one item failing never cancels its siblings: callers return a
//! `Result` per item and decide what to do with the failures.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Apply `worker` to every item with at most `concurrency` in flight
///
/// Outputs are returned in completion order, not input order.
pub async fn for_each_bounded<T, R, F, Fut>(items: Vec<T>, concurrency: usize, worker: F) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let concurrency = concurrency.max(1).min(items.len().max(1));

    stream::iter(items)
        .map(worker)
        .buffer_unordered(concurrency)
        .collect()
        .await
}
