//! URL-to-record extraction with a fallback strategy.
//!
//! [`Extractor::extract`] downloads the page and runs [`Readability`] over it.
//! If anything in that path fails it downloads the page again with a shorter
//! timeout and runs [`fallback::scrape`]. Only when both fail does the caller
//! get an [`ExtractionFailure`], and it never gets a panic or a raw error.
//! Parsing runs on the blocking thread pool so a large page never stalls the
//! async workers.
//!
//! ```no_run
//! use shelfmark_core::{Extractor, ExtractorConfig};
//!
//! # async fn run() {
//! let extractor = Extractor::new(ExtractorConfig::default());
//! match extractor.extract("https://example.com/post").await {
//!     Ok(record) => println!("{}", record.title),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::article::ArticleRecord;
use crate::fallback;
use crate::fetch::{FetchConfig, HttpFetcher, PageFetcher, parse_http_url};
use crate::readability::{Readability, ReadabilityConfig};
use crate::{Result, ShelfmarkError};

/// Why an extraction attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Not an absolute http(s) URL.
    InvalidUrl,
    Timeout,
    /// The server answered with this non-2xx status.
    HttpStatus(u16),
    /// Connection, TLS or body decoding problem.
    Network,
    /// The page was fetched but yielded no article.
    Unparseable,
}

impl FailureKind {
    pub fn of(error: &ShelfmarkError) -> Self {
        match error {
            ShelfmarkError::InvalidUrl(_) => Self::InvalidUrl,
            ShelfmarkError::Timeout { .. } => Self::Timeout,
            ShelfmarkError::HttpStatus { status } => Self::HttpStatus(*status),
            ShelfmarkError::HttpError(e) if e.is_timeout() => Self::Timeout,
            ShelfmarkError::HttpError(_) | ShelfmarkError::Io(_) | ShelfmarkError::FileNotFound(_) => Self::Network,
            ShelfmarkError::HtmlParseError(_)
            | ShelfmarkError::NotReadable { .. }
            | ShelfmarkError::NoContent
            | ShelfmarkError::Task(_) => Self::Unparseable,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl => f.write_str("invalid url"),
            Self::Timeout => f.write_str("timeout"),
            Self::HttpStatus(status) => write!(f, "http status {status}"),
            Self::Network => f.write_str("network error"),
            Self::Unparseable => f.write_str("unparseable document"),
        }
    }
}

/// Both strategies failed for `url`.
#[derive(Debug, Clone, Error)]
#[error("could not extract {url} ({kind}): {message}")]
pub struct ExtractionFailure {
    pub url: String,
    /// Kind of the last failure, which is the fallback's unless the URL was rejected up front.
    pub kind: FailureKind,
    pub message: String,
}

impl ExtractionFailure {
    fn new(url: &str, error: &ShelfmarkError) -> Self {
        Self { url: url.to_string(), kind: FailureKind::of(error), message: error.to_string() }
    }
}

/// Settings for both strategies.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Fetch settings for the primary strategy (30 s timeout).
    pub primary: FetchConfig,
    /// Fetch settings for the fallback strategy (10 s timeout).
    pub fallback: FetchConfig,
    pub readability: ReadabilityConfig,
    /// Skip the primary strategy entirely.
    pub fallback_only: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            primary: FetchConfig::with_timeout(30),
            fallback: FetchConfig::with_timeout(10),
            readability: ReadabilityConfig::default(),
            fallback_only: false,
        }
    }
}

/// Two-strategy article extractor.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Arc<dyn PageFetcher>,
    config: ExtractorConfig,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Extractor {
    /// Extractor that downloads over HTTP.
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_fetcher(Arc::new(HttpFetcher::new()), config)
    }

    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>, config: ExtractorConfig) -> Self {
        Self { fetcher, config }
    }

    /// Fetches `url` and extracts its article.
    ///
    /// Each strategy makes exactly one request; nothing is retried.
    pub async fn extract(&self, url: &str) -> std::result::Result<ArticleRecord, ExtractionFailure> {
        if let Err(e) = parse_http_url(url) {
            return Err(ExtractionFailure::new(url, &e));
        }

        if !self.config.fallback_only {
            match self.primary(url).await {
                Ok(record) => {
                    tracing::debug!(url, strategy = "primary", "extracted article");
                    return Ok(record);
                }
                Err(e) => {
                    tracing::warn!(url, kind = %FailureKind::of(&e), error = %e, "primary extraction failed, falling back");
                }
            }
        }

        match self.fallback(url).await {
            Ok(record) => {
                tracing::debug!(url, strategy = "fallback", "extracted article");
                Ok(record)
            }
            Err(e) => {
                let failure = ExtractionFailure::new(url, &e);
                tracing::warn!(url, kind = %failure.kind, error = %e, "fallback extraction failed");
                Err(failure)
            }
        }
    }

    /// Runs both strategies over HTML that was already fetched from `url`.
    pub fn extract_html(&self, html: &str, url: &str) -> std::result::Result<ArticleRecord, ExtractionFailure> {
        if !self.config.fallback_only {
            match self.readability().parse_with_url(html, url) {
                Ok(article) => return Ok(article.into_record()),
                Err(e) => tracing::debug!(url, error = %e, "primary extraction failed, falling back"),
            }
        }
        fallback::scrape(html, url).map_err(|e| ExtractionFailure::new(url, &e))
    }

    async fn primary(&self, url: &str) -> Result<ArticleRecord> {
        let html = self.fetcher.fetch(url, &self.config.primary).await?;
        let readability = self.readability();
        let url = url.to_string();
        let article = tokio::task::spawn_blocking(move || readability.parse_with_url(&html, &url)).await??;
        Ok(article.into_record())
    }

    async fn fallback(&self, url: &str) -> Result<ArticleRecord> {
        let html = self.fetcher.fetch(url, &self.config.fallback).await?;
        let url = url.to_string();
        tokio::task::spawn_blocking(move || fallback::scrape(&html, &url)).await?
    }

    fn readability(&self) -> Readability {
        Readability::with_config(self.config.readability.clone())
    }
}
