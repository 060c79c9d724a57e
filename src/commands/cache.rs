use anyhow::Result;

use hive_exporter::config::Config;
use hive_exporter::models::{normalize_username, sort_newest_first};
use hive_exporter::storage::PostStore;

use super::open_store;

/// Remove every cached post and session log
pub fn clear_cache(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let before = store.count()?;
    store.clear()?;

    println!("Cache cleared ({before} posts removed)");
    println!("Path: {}", config.cache.sqlite_path.display());
    Ok(())
}

/// Print cache statistics for one user
pub fn stats(config: &Config, username: &str) -> Result<()> {
    let username = normalize_username(username)?;
    let store = open_store(config)?;

    let mut posts = store.get_by_owner(&username)?;
    sort_newest_first(&mut posts);

    println!("Cache Statistics");
    println!("================");
    println!("User: @{username}");
    println!("Cached posts: {}", posts.len());
    println!("All users: {}", store.count()?);

    if let (Some(newest), Some(oldest)) = (posts.first(), posts.last()) {
        println!("Newest: {} ({})", newest.created_date(), newest.permlink);
        println!("Oldest: {} ({})", oldest.created_date(), oldest.permlink);
    }

    match store.load_session_log(&username)? {
        Some(log) => {
            println!("\nLast Session");
            println!("Status: {}", log.status);
            println!("Finished: {}", log.finished_at.format("%Y-%m-%d %H:%M:%S"));
            println!("Posts: {} ({} new)", log.post_count, log.new_posts);
            if let Some(cursor) = log.cursor {
                println!("Cursor: {cursor}");
            }
        }
        None => println!("\nNo session recorded"),
    }

    Ok(())
}
