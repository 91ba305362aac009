//! Error types for Shelfmark extraction.
//!
//! [`ShelfmarkError`] covers everything that can go wrong while fetching or
//! parsing a single page. The extractor folds these into an
//! [`ExtractionFailure`](crate::ExtractionFailure) value at its boundary, so
//! callers of [`Extractor::extract`](crate::Extractor::extract) never see them
//! directly.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::{ShelfmarkError, Result};
//!
//! fn require_body(html: &str) -> Result<&str> {
//!     if html.trim().is_empty() {
//!         return Err(ShelfmarkError::NoContent);
//!     }
//!     Ok(html)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fetching and extraction operations.
#[derive(Error, Debug)]
pub enum ShelfmarkError {
    /// HTTP request errors from reqwest.
    ///
    /// Covers DNS failures, refused connections, TLS problems and body
    /// decoding errors.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The server answered with a non-success status.
    #[error("Server responded with HTTP {status}")]
    HttpStatus { status: u16 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, including invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// Content is not readable (score below threshold).
    ///
    /// Navigation pages, search results and near-empty pages usually end up
    /// here.
    #[error("Content is not readable (score {score} below threshold {threshold})")]
    NotReadable { score: f64, threshold: f64 },

    /// No content could be extracted from the document.
    #[error("No content could be extracted from the document")]
    NoContent,

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O errors while reading local input.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking parse task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for ShelfmarkError.
pub type Result<T> = std::result::Result<T, ShelfmarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShelfmarkError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_not_readable_error() {
        let err = ShelfmarkError::NotReadable { score: 15.0, threshold: 20.0 };
        assert!(err.to_string().contains("15"));
        assert!(err.to_string().contains("20"));
    }

    #[test]
    fn test_status_error() {
        let err = ShelfmarkError::HttpStatus { status: 404 };
        assert_eq!(err.to_string(), "Server responded with HTTP 404");
    }
}
