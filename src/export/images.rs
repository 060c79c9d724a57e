//! Image discovery and download for archives
//!
//! Image URLs are found in the post body and fetched through the Hive image
//! proxy. A failed image never fails the post it belongs to.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use crate::config::ExportConfig;
use crate::utils::error::ExportError;
use crate::utils::pool::for_each_bounded;

/// Directory name images are stored under, inside a post directory
pub const IMAGE_DIR: &str = "imagens";

/// Extension used when the response has no usable content type
const DEFAULT_EXTENSION: &str = "jpg";

/// Find image URLs in `text`, deduplicated in first-seen order
pub fn extract_image_urls(text: &str) -> Vec<String> {
    static IMAGE_URL: OnceLock<Regex> = OnceLock::new();

    let re = IMAGE_URL.get_or_init(|| {
        Regex::new(r#"(?i)(https?://[^\s<>"')]+?\.(?:jpg|jpeg|png|gif|webp|svg))"#)
            .expect("Invalid regex pattern")
    });

    let mut seen = HashSet::new();
    re.find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// File extension from a `Content-Type` value such as `image/png; q=1`
pub fn extension_for(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|mime| mime.split_once('/'))
        .map(|(_, subtype)| subtype.split('+').next().unwrap_or("").trim().to_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Downloads images through the proxy
pub struct ImageFetcher {
    client: reqwest::Client,
    proxy: String,
    concurrency: usize,
}

impl ImageFetcher {
    pub fn new(proxy: &str, concurrency: usize, timeout: Duration) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::Image(e.to_string()))?;

        Ok(Self {
            client,
            proxy: proxy.to_string(),
            concurrency: concurrency.max(1),
        })
    }

    pub fn from_config(config: &ExportConfig, timeout: Duration) -> Result<Self, ExportError> {
        Self::new(&config.image_proxy, config.image_concurrency, timeout)
    }

    /// Fetch one image, returning its bytes and file extension
    pub async fn fetch(&self, url: &str) -> Result<(Vec<u8>, String), ExportError> {
        let proxied = format!("{}{}", self.proxy, url);

        let response = self
            .client
            .get(&proxied)
            .send()
            .await
            .map_err(|e| ExportError::Image(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(ExportError::Image(format!(
                "{url}: HTTP {}",
                response.status().as_u16()
            )));
        }

        let extension = extension_for(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExportError::Image(format!("{url}: {e}")))?;

        Ok((bytes.to_vec(), extension))
    }

    /// Download every image referenced by `body` into `<post_dir>/imagens`
    ///
    /// Files are named `img_<n>.<ext>` with `n` the 1-based position of the
    /// URL in the body. Returns how many images were saved.
    pub async fn download_all(&self, body: &str, post_dir: &Path) -> usize {
        let urls = extract_image_urls(body);
        if urls.is_empty() {
            return 0;
        }

        let image_dir = post_dir.join(IMAGE_DIR);
        if let Err(e) = tokio::fs::create_dir_all(&image_dir).await {
            tracing::warn!(
                path = %image_dir.display(),
                error = %e,
                "Failed to create image directory"
            );
            return 0;
        }

        let image_dir = image_dir.as_path();
        let results = for_each_bounded(
            urls.into_iter().enumerate().collect(),
            self.concurrency,
            move |(i, url): (usize, String)| async move {
                let (bytes, extension) = self.fetch(&url).await?;
                let path = image_dir.join(format!("img_{}.{}", i + 1, extension));
                tokio::fs::write(&path, bytes).await?;
                Ok::<_, ExportError>(path)
            },
        )
        .await;

        results
            .into_iter()
            .filter(|result| match result {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "Saved image");
                    true
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping image");
                    false
                }
            })
            .count()
    }
}
