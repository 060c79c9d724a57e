//! Unified error handling for the hive-exporter crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`ExporterErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use hive_exporter::error::{Error, ExporterErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Progress is cached, run again with --resume: {err}");
//!     } else {
//!         eprintln!("Fatal error: {err}");
//!     }
//! }
//! ```

use thiserror::Error;

pub use crate::utils::error::{CacheError, ExportError, MetadataError, RpcError};

/// Common trait for hive-exporter error types
pub trait ExporterErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later run can pick up the work)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// RPC nodes, HTTP, timeouts
    Network,
    /// Local cache and filesystem
    Storage,
    /// Malformed payloads and templates
    Parsing,
    /// Rejected user input
    Input,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Human readable category name
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::Storage => "storage error",
            Self::Parsing => "parsing error",
            Self::Input => "invalid input",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the hive-exporter crate
#[derive(Error, Debug)]
pub enum Error {
    /// RPC failover client errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Local cache errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Empty or otherwise unusable username
    #[error("Invalid input: {0}")]
    InvalidUserInput(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ExporterErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Rpc(e) => !matches!(e, RpcError::NoNodes),
            Self::Cache(_) => false,
            Self::Export(e) => matches!(e, ExportError::Io(_) | ExportError::Image(_)),
            Self::InvalidUserInput(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Rpc(RpcError::NoNodes) => ErrorCategory::Config,
            Self::Rpc(RpcError::Decode(_)) => ErrorCategory::Parsing,
            Self::Rpc(_) => ErrorCategory::Network,
            Self::Cache(CacheError::Serialization(_)) => ErrorCategory::Parsing,
            Self::Cache(_) => ErrorCategory::Storage,
            Self::Export(e) => match e {
                ExportError::InvalidRange { .. }
                | ExportError::NoPosts(_)
                | ExportError::UnknownFormat(_) => ErrorCategory::Input,
                ExportError::Template(_)
                | ExportError::TemplateRegistration(_)
                | ExportError::Json(_) => ErrorCategory::Parsing,
                ExportError::Io(_) => ErrorCategory::Storage,
                ExportError::Image(_) => ErrorCategory::Network,
            },
            Self::InvalidUserInput(_) => ErrorCategory::Input,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::Rpc(RpcError::Timeout);
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = Error::InvalidUserInput("empty".to_string());
        assert_eq!(err.category(), ErrorCategory::Input);

        let err = Error::Rpc(RpcError::NoNodes);
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_is_recoverable() {
        let exhausted = Error::Rpc(RpcError::AllNodesExhausted {
            attempts: 3,
            last_error: "timeout".to_string(),
        });
        assert!(exhausted.is_recoverable());

        let input = Error::InvalidUserInput("empty".to_string());
        assert!(!input.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = RpcError::Status(502).into();
        assert!(matches!(unified, Error::Rpc(RpcError::Status(502))));

        let unified: Error = ExportError::NoPosts("alice".to_string()).into();
        assert_eq!(unified.category(), ErrorCategory::Input);
    }

    #[test]
    fn test_misconfiguration_is_not_recoverable() {
        let err = Error::Rpc(RpcError::NoNodes);
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.category().description(), "configuration error");

        let err = Error::Rpc(RpcError::Decode("no permlink".to_string()));
        assert_eq!(err.category(), ErrorCategory::Parsing);
        assert!(err.is_recoverable());
    }
}
