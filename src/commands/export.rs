use anyhow::{Context, Result};
use std::path::PathBuf;

use hive_exporter::config::Config;
use hive_exporter::crawler::CancelToken;
use hive_exporter::export::{ExportFormat, ExportRange, Exporter};
use hive_exporter::models::normalize_username;
use hive_exporter::storage::PostStore;

use super::{fetch, open_store};

/// Options of the `export` command
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub username: String,
    pub format: String,
    pub start: usize,
    pub end: Option<usize>,
    pub output: Option<PathBuf>,
    /// Run a fetch session before exporting
    pub refresh: bool,
    /// With `refresh`, resume from the oldest cached post
    pub resume: bool,
}

pub async fn export(mut config: Config, args: ExportArgs, cancel: &CancelToken) -> Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let username = normalize_username(&args.username)?;

    if let Some(output) = args.output {
        config.export.output_dir = output;
    }

    let posts = if args.refresh {
        let outcome = fetch(&config, &username, args.resume, cancel).await?;
        if outcome.is_partial() {
            tracing::warn!(username = %username, "Exporting a partial post list");
        }
        outcome.posts
    } else {
        let store = open_store(&config)?;
        store
            .get_by_owner(&username)
            .with_context(|| format!("Failed to read cached posts for @{username}"))?
    };

    if posts.is_empty() {
        println!("No cached posts for @{username}. Run `fetch {username}` first.");
        return Ok(());
    }

    let range = ExportRange::new(args.start, args.end.unwrap_or(usize::MAX));
    let exporter = Exporter::from_config(&config.export, config.request_timeout())?;

    println!("\nExporting @{username} as {format}");
    println!("========================");

    let report = exporter.export(&username, &posts, format, range).await?;

    println!("Written: {}", report.written);
    if report.failed > 0 {
        println!("Failed: {}", report.failed);
    }
    if format == ExportFormat::MarkdownWithImages {
        println!("Images: {}", report.images);
    }
    println!("Output: {}", report.output.display());

    Ok(())
}
