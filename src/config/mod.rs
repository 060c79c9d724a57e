//! Configuration management for the Hive exporter
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Defaults match the public Hive API nodes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Public Hive API nodes, tried in this order
pub const DEFAULT_NODES: &[&str] = &[
    "https://api.hive.blog",
    "https://api.deathwing.me",
    "https://api.openhive.network",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// RPC node configuration
    pub rpc: RpcConfig,

    /// Feed pagination configuration
    pub pagination: PaginationConfig,

    /// Local cache configuration
    pub cache: CacheConfig,

    /// Export configuration
    pub export: ExportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// JSON-RPC node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Node base URLs, in failover order
    pub nodes: Vec<String>,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    /// User agent string
    pub user_agent: String,
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Posts requested per page
    pub page_size: usize,

    /// Pause between page requests in milliseconds
    pub batch_delay_ms: u64,
}

/// Local cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory archives are written to
    pub output_dir: PathBuf,

    /// Posts rendered concurrently
    pub post_concurrency: usize,

    /// Images downloaded concurrently per post
    pub image_concurrency: usize,

    /// Image proxy prefix; the original image URL is appended to it
    pub image_proxy: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            nodes: DEFAULT_NODES.iter().map(|s| s.to_string()).collect(),
            timeout_ms: 8_000,
            user_agent: format!("hive-exporter/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            batch_delay_ms: 200,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_cache_path(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            post_concurrency: 5,
            image_concurrency: 8,
            image_proxy: String::from("https://images.hive.blog/0x0/"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// `$XDG_DATA_HOME/hive-exporter/cache.db`, or `./data/cache.db` without one
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hive-exporter"))
        .unwrap_or_else(|| PathBuf::from("data"))
        .join("cache.db")
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(nodes) = std::env::var("HIVE_EXPORTER_NODES") {
            config.rpc.nodes = nodes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(timeout_ms) = env_parse("HIVE_EXPORTER_TIMEOUT_MS") {
            config.rpc.timeout_ms = timeout_ms;
        }

        if let Some(page_size) = env_parse("HIVE_EXPORTER_PAGE_SIZE") {
            config.pagination.page_size = page_size;
        }

        if let Some(delay) = env_parse("HIVE_EXPORTER_BATCH_DELAY_MS") {
            config.pagination.batch_delay_ms = delay;
        }

        if let Ok(path) = std::env::var("HIVE_EXPORTER_CACHE_PATH") {
            config.cache.sqlite_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("HIVE_EXPORTER_OUTPUT_DIR") {
            config.export.output_dir = PathBuf::from(dir);
        }

        if let Some(n) = env_parse("HIVE_EXPORTER_POST_CONCURRENCY") {
            config.export.post_concurrency = n;
        }

        if let Some(n) = env_parse("HIVE_EXPORTER_IMAGE_CONCURRENCY") {
            config.export.image_concurrency = n;
        }

        if let Ok(level) = std::env::var("HIVE_EXPORTER_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("HIVE_EXPORTER_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.rpc.nodes.is_empty() {
            anyhow::bail!("at least one RPC node is required");
        }

        for node in &self.rpc.nodes {
            Url::parse(node).with_context(|| format!("invalid RPC node URL: {node}"))?;
        }

        if self.rpc.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }

        if self.pagination.page_size == 0 {
            anyhow::bail!("page_size must be greater than 0");
        }

        if self.export.post_concurrency == 0 || self.export.image_concurrency == 0 {
            anyhow::bail!("export concurrency must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc.timeout_ms)
    }
}
