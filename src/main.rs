use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hive_exporter::config::Config;
use hive_exporter::crawler::{CancelToken, SessionStatus};
use hive_exporter::error::ExporterErrorTrait;

mod commands;

#[derive(Parser)]
#[command(
    name = "hive-exporter",
    version,
    about = "Archive a Hive author's blog to local files",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configuration
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch an author's blog into the local cache
    Fetch {
        /// Hive username
        username: String,

        /// Resume from the oldest cached post instead of the newest post
        #[arg(long, default_value = "false")]
        resume: bool,
    },

    /// Export cached posts to files
    Export {
        /// Hive username
        username: String,

        /// Output format (markdown, markdown-images, json, text)
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// First post to export, 1-based, oldest first
        #[arg(long, default_value = "1")]
        start: usize,

        /// Last post to export (inclusive); defaults to the newest post
        #[arg(long)]
        end: Option<usize>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fetch new posts before exporting
        #[arg(long, default_value = "false")]
        refresh: bool,

        /// With --refresh, resume from the oldest cached post
        #[arg(long, default_value = "false")]
        resume: bool,
    },

    /// Remove every cached post for all users
    ClearCache,

    /// Show cache statistics for an author
    Stats {
        /// Hive username
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let log_format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    let log_level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    setup_tracing(log_format, log_level)?;

    tracing::debug!(
        nodes = ?config.rpc.nodes,
        cache = %config.cache.sqlite_path.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Fetch { username, resume } => {
            tracing::info!(username = %username, resume, "Starting fetch command");
            let cancel = cancel_on_ctrl_c();
            let outcome = commands::fetch(&config, &username, resume, &cancel).await?;
            if let SessionStatus::Aborted(e) = outcome.status {
                let context = format!("Fetch session aborted ({})", e.category().description());
                return Err(e).context(context);
            }
        }

        Commands::Export {
            username,
            format,
            start,
            end,
            output,
            refresh,
            resume,
        } => {
            tracing::info!(
                username = %username,
                format = %format,
                start,
                end = ?end,
                refresh,
                "Starting export command"
            );
            let cancel = cancel_on_ctrl_c();
            let args = commands::ExportArgs {
                username,
                format,
                start,
                end,
                output,
                refresh,
                resume,
            };
            commands::export(config, args, &cancel).await?;
        }

        Commands::ClearCache => {
            tracing::info!("Starting clear-cache command");
            commands::clear_cache(&config)?;
        }

        Commands::Stats { username } => {
            commands::stats(&config, &username)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancelToken {
    let cancel = CancelToken::new();
    let handle = cancel.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            handle.cancel();
        }
    });

    cancel
}

fn setup_tracing(format: &str, level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(format!("hive_exporter={level},warn"))
        .context("Invalid log level")?;

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
