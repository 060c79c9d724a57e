use anyhow::Result;

use hive_exporter::config::Config;
use hive_exporter::crawler::{CancelToken, SessionMode, SessionOutcome, SessionStatus};
use hive_exporter::error::ExporterErrorTrait;

use super::{build_engine, open_store};

/// Run one fetch session and print its summary
pub async fn fetch(
    config: &Config,
    username: &str,
    resume: bool,
    cancel: &CancelToken,
) -> Result<SessionOutcome> {
    let store = open_store(config)?;
    let engine = build_engine(config, store)?;

    let mode = if resume {
        SessionMode::Continuation
    } else {
        SessionMode::Fresh
    };

    println!("Fetching @{} ({})", username.trim().to_lowercase(), mode_label(mode));
    println!("========================");

    let outcome = engine.run(username, mode, cancel).await?;
    print_summary(&outcome);

    Ok(outcome)
}

fn mode_label(mode: SessionMode) -> &'static str {
    match mode {
        SessionMode::Fresh => "fresh scan",
        SessionMode::Continuation => "resuming",
    }
}

fn print_summary(outcome: &SessionOutcome) {
    println!();
    println!("Session Summary");
    println!("===============");
    println!("User: @{}", outcome.username);
    println!("Status: {}", outcome.status.as_str());
    println!("Posts from cache: {}", outcome.cached_posts);
    println!("New posts: {}", outcome.new_posts);
    println!("Total posts: {}", outcome.posts.len());
    println!("Pages fetched: {}", outcome.pages_fetched);
    if let Some(cursor) = &outcome.cursor {
        println!("Last cursor: {cursor}");
    }

    match &outcome.status {
        SessionStatus::Completed => {}
        SessionStatus::Cancelled => {
            println!("\nCancelled. Progress is cached, run again with --resume to continue.");
        }
        SessionStatus::Aborted(e) => {
            println!("\nAborted ({}): {e}", e.category().description());
            if e.is_recoverable() {
                println!("Progress is cached, run again with --resume to continue.");
            } else {
                println!("Retrying will not help until this is fixed.");
            }
        }
    }
}
