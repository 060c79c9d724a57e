//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod pool;

use regex::Regex;
use std::sync::OnceLock;

/// Maximum length of a generated file or directory name
pub const MAX_FILENAME_LEN: usize = 50;

/// Sanitize a string for use as a file name
///
/// Characters that are invalid on common filesystems are replaced with `-`,
/// the result is cut to [`MAX_FILENAME_LEN`] characters and trimmed.
pub fn sanitize_filename(name: &str) -> String {
    static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

    let re = INVALID_CHARS
        .get_or_init(|| Regex::new(r#"[/\\?%*:|"<>]"#).expect("Invalid regex pattern"));

    let replaced = re.replace_all(name, "-");
    replaced
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Truncate text to at most `max_chars` characters, respecting char boundaries
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
