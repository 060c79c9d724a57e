//! Export of cached posts to files
//!
//! Posts are exported oldest first. A 1-based inclusive [`ExportRange`]
//! selects a slice of that order and each selected post keeps its position as
//! its index in file names and headings.
//!
//! | Format | Output |
//! |--------|--------|
//! | `markdown` | `<out>/<user>_backup/<index>_<slug>/post.md` |
//! | `markdown-images` | same, plus `imagens/img_<n>.<ext>` per post |
//! | `json` | `<out>/<user>_posts.json` |
//! | `text` | `<out>/<user>_hive.txt` |

pub mod images;
pub mod render;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::config::ExportConfig;
use crate::models::{sort_oldest_first, Post};
use crate::utils::error::ExportError;
use crate::utils::pool::for_each_bounded;
use crate::utils::sanitize_filename;

pub use images::{extract_image_urls, ImageFetcher};
pub use render::PostRenderer;

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One directory per post holding `post.md`
    Markdown,
    /// [`ExportFormat::Markdown`] plus the images referenced by each post
    MarkdownWithImages,
    /// All selected posts in one JSON array
    Json,
    /// All selected posts in one plain-text book
    Text,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::MarkdownWithImages => "markdown-images",
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "markdown-images" | "full" => Ok(Self::MarkdownWithImages),
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based inclusive range over the oldest-first export order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRange {
    pub start: usize,
    pub end: usize,
}

impl ExportRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Every post
    pub fn all() -> Self {
        Self::new(1, usize::MAX)
    }

    /// Zero-based `start..end` slice bounds for `total` posts
    ///
    /// `end` is clamped to `total`. A range is valid when
    /// `1 <= start <= end` and `start <= total`.
    pub fn resolve(&self, total: usize) -> Result<(usize, usize), ExportError> {
        if self.start < 1 || self.start > self.end || self.start > total {
            return Err(ExportError::InvalidRange {
                start: self.start,
                end: self.end,
                total,
            });
        }

        Ok((self.start - 1, self.end.min(total)))
    }
}

impl Default for ExportRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Summary of an export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Posts written successfully
    pub written: usize,
    /// Posts that could not be written
    pub failed: usize,
    /// Images saved across all posts
    pub images: usize,
    /// Archive directory or output file
    pub output: PathBuf,
}

/// Writes posts to disk in one of the [`ExportFormat`]s
pub struct Exporter {
    renderer: PostRenderer,
    images: Option<ImageFetcher>,
    output_dir: PathBuf,
    post_concurrency: usize,
}

impl Exporter {
    /// Create an exporter without image download support
    pub fn new(output_dir: &Path, post_concurrency: usize) -> Result<Self, ExportError> {
        Ok(Self {
            renderer: PostRenderer::new()?,
            images: None,
            output_dir: output_dir.to_path_buf(),
            post_concurrency: post_concurrency.max(1),
        })
    }

    /// Create an exporter from configuration, with image download support
    pub fn from_config(config: &ExportConfig, timeout: Duration) -> Result<Self, ExportError> {
        let mut exporter = Self::new(&config.output_dir, config.post_concurrency)?;
        exporter.images = Some(ImageFetcher::from_config(config, timeout)?);
        Ok(exporter)
    }

    /// Use `fetcher` for [`ExportFormat::MarkdownWithImages`]
    pub fn with_image_fetcher(mut self, fetcher: ImageFetcher) -> Self {
        self.images = Some(fetcher);
        self
    }

    /// Export `posts` of `username` in `format`
    ///
    /// `posts` may be in any order; they are exported oldest first.
    ///
    /// # Errors
    ///
    /// `ExportError::NoPosts` when `posts` is empty, `ExportError::InvalidRange`
    /// when `range` selects nothing. Per-post failures in directory formats are
    /// counted in the report instead.
    pub async fn export(
        &self,
        username: &str,
        posts: &[Post],
        format: ExportFormat,
        range: ExportRange,
    ) -> Result<ExportReport, ExportError> {
        if posts.is_empty() {
            return Err(ExportError::NoPosts(username.to_string()));
        }

        let mut ordered = posts.to_vec();
        sort_oldest_first(&mut ordered);

        let (from, to) = range.resolve(ordered.len())?;
        let selected: Vec<(usize, Post)> = ordered
            .drain(from..to)
            .enumerate()
            .map(|(offset, post)| (range.start + offset, post))
            .collect();

        tracing::info!(
            username = %username,
            format = %format,
            first = range.start,
            count = selected.len(),
            "Exporting posts"
        );

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let report = match format {
            ExportFormat::Markdown => self.write_archive(username, selected, false).await?,
            ExportFormat::MarkdownWithImages => self.write_archive(username, selected, true).await?,
            ExportFormat::Json => self.write_json(username, selected).await?,
            ExportFormat::Text => self.write_book(username, selected).await?,
        };

        tracing::info!(
            username = %username,
            written = report.written,
            failed = report.failed,
            images = report.images,
            output = %report.output.display(),
            "Export finished"
        );

        Ok(report)
    }

    async fn write_archive(
        &self,
        username: &str,
        selected: Vec<(usize, Post)>,
        with_images: bool,
    ) -> Result<ExportReport, ExportError> {
        let archive_dir = self.output_dir.join(format!("{username}_backup"));
        tokio::fs::create_dir_all(&archive_dir).await?;

        let images = if with_images {
            self.images.as_ref()
        } else {
            None
        };
        if with_images && images.is_none() {
            tracing::warn!("Image download requested but no image fetcher is configured");
        }

        let dir = archive_dir.as_path();
        let results = for_each_bounded(selected, self.post_concurrency, move |(index, post)| {
            self.write_post_dir(dir, index, post, images)
        })
        .await;

        let mut report = ExportReport {
            output: archive_dir,
            ..Default::default()
        };
        for result in results {
            match result {
                Ok(saved_images) => {
                    report.written += 1;
                    report.images += saved_images;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to export post");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Write `<index>_<slug>/post.md`, then its images; returns images saved
    async fn write_post_dir(
        &self,
        archive_dir: &Path,
        index: usize,
        post: Post,
        images: Option<&ImageFetcher>,
    ) -> Result<usize, ExportError> {
        let post_dir = archive_dir.join(format!("{index}_{}", post_slug(&post)));
        tokio::fs::create_dir_all(&post_dir).await?;

        let text = self.renderer.render_post(&post)?;
        tokio::fs::write(post_dir.join("post.md"), text).await?;
        tracing::debug!(index, permlink = %post.permlink, "Saved post");

        Ok(match images {
            Some(fetcher) => fetcher.download_all(&post.body, &post_dir).await,
            None => 0,
        })
    }

    async fn write_json(
        &self,
        username: &str,
        selected: Vec<(usize, Post)>,
    ) -> Result<ExportReport, ExportError> {
        let path = self.output_dir.join(format!("{username}_posts.json"));
        let posts: Vec<Post> = selected.into_iter().map(|(_, post)| post).collect();

        let json = serde_json::to_string_pretty(&posts)?;
        tokio::fs::write(&path, json).await?;

        Ok(ExportReport {
            written: posts.len(),
            output: path,
            ..Default::default()
        })
    }

    async fn write_book(
        &self,
        username: &str,
        selected: Vec<(usize, Post)>,
    ) -> Result<ExportReport, ExportError> {
        let path = self.output_dir.join(format!("{username}_hive.txt"));

        let mut book = String::new();
        for (index, post) in &selected {
            if !book.is_empty() {
                book.push('\n');
            }
            book.push_str(&self.renderer.render_book_entry(*index, post)?);
        }

        tokio::fs::write(&path, book).await?;

        Ok(ExportReport {
            written: selected.len(),
            output: path,
            ..Default::default()
        })
    }
}

/// Directory slug: sanitized `<YYYY-MM-DD>_<permlink>`
pub fn post_slug(post: &Post) -> String {
    sanitize_filename(&format!("{}_{}", post.created_date(), post.permlink))
}
