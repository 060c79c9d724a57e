pub mod cache;
pub mod export;
pub mod fetch;

use anyhow::{Context, Result};
use std::sync::Arc;

use hive_exporter::config::Config;
use hive_exporter::crawler::{BlogFeed, NodeClient, PaginationEngine};
use hive_exporter::storage::SqlitePostStore;

// Re-export command functions for convenience
pub use cache::{clear_cache, stats};
pub use export::{export, ExportArgs};
pub use fetch::fetch;

/// Open the SQLite cache named by the configuration
pub(crate) fn open_store(config: &Config) -> Result<Arc<SqlitePostStore>> {
    let store = SqlitePostStore::new(&config.cache.sqlite_path).with_context(|| {
        format!(
            "Failed to open cache at {}",
            config.cache.sqlite_path.display()
        )
    })?;
    Ok(Arc::new(store))
}

/// Build a pagination engine over the configured nodes and `store`
pub(crate) fn build_engine(
    config: &Config,
    store: Arc<SqlitePostStore>,
) -> Result<PaginationEngine> {
    let client = NodeClient::from_config(&config.rpc).context("Failed to create RPC client")?;
    Ok(PaginationEngine::new(
        Arc::new(BlogFeed::new(client)),
        store,
        &config.pagination,
    ))
}
