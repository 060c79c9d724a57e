//! Error types for the Hive exporter
//!
//! This module defines the domain error types used throughout the application.

use thiserror::Error;

/// Errors raised by the JSON-RPC failover client
#[derive(Error, Debug)]
pub enum RpcError {
    /// HTTP transport error (connection refused, reset, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the per-attempt timeout
    #[error("Request timeout")]
    Timeout,

    /// Node answered with a non-2xx status
    #[error("Server error: HTTP {0}")]
    Status(u16),

    /// Response body was not a JSON-RPC envelope
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Node answered with a JSON-RPC `error` payload
    #[error("RPC error {code}: {message}")]
    Remote { code: i64, message: String },

    /// Every configured node failed once in the current rotation
    #[error("All {attempts} nodes failed, last error: {last_error}")]
    AllNodesExhausted { attempts: usize, last_error: String },

    /// The client was built without any node
    #[error("No RPC nodes configured")]
    NoNodes,
}

/// Errors raised by the local post cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Post could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cache location could not be prepared
    #[error("Cache path error: {0}")]
    Path(String),
}

/// Why a post's `json_metadata` could not be read
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Field absent or blank
    #[error("metadata is empty")]
    Missing,

    /// Field is not valid JSON
    #[error("metadata is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Field is valid JSON but not an object
    #[error("metadata is not a JSON object")]
    NotAnObject,
}

/// Errors raised while exporting posts
#[derive(Error, Debug)]
pub enum ExportError {
    /// Requested range does not select any post
    #[error("Invalid range {start}..={end} for {total} posts")]
    InvalidRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// Nothing to export
    #[error("No posts to export for @{0}")]
    NoPosts(String),

    /// Unknown export format name
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// Template registration failed
    #[error("Template registration error: {0}")]
    TemplateRegistration(#[from] Box<handlebars::TemplateError>),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image download failed
    #[error("Image download failed: {0}")]
    Image(String),
}
