//! Page retrieval from URLs, files, and stdin.
//!
//! Network access goes through the [`PageFetcher`] trait so the extractor's
//! strategy ordering can be exercised without a network. [`HttpFetcher`] is
//! the reqwest-backed implementation used in production.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{Result, ShelfmarkError};

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Shelfmark/0.3; +https://shelfmark.app/bot)";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl FetchConfig {
    /// Default config with a different timeout.
    pub fn with_timeout(timeout: u64) -> Self {
        Self { timeout, ..Default::default() }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// Source of raw page HTML.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Downloads `url` and returns the decoded body.
    async fn fetch(&self, url: &str, config: &FetchConfig) -> Result<String>;
}

/// [`PageFetcher`] backed by a shared reqwest [`Client`].
///
/// The per-request timeout comes from the [`FetchConfig`] passed to each call,
/// so one fetcher serves both extraction strategies.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, config: &FetchConfig) -> Result<String> {
        fetch_with_client(&self.client, url, config).await
    }
}

/// Parses and validates a URL the way every fetch path expects it.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| ShelfmarkError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ShelfmarkError::InvalidUrl(format!(
            "unsupported scheme '{}', expected http or https",
            other
        ))),
    }
}

async fn fetch_with_client(client: &Client, url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = parse_http_url(url)?;
    let timed_out = |e: reqwest::Error| {
        if e.is_timeout() { ShelfmarkError::Timeout { timeout: config.timeout } } else { ShelfmarkError::HttpError(e) }
    };

    let response = client
        .get(parsed_url)
        .timeout(Duration::from_secs(config.timeout))
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(timed_out)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ShelfmarkError::HttpStatus { status: status.as_u16() });
    }

    response.text().await.map_err(timed_out)
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() { Err(ShelfmarkError::FileNotFound(path_buf)) } else { Ok(fs::read_to_string(&path_buf)?) }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    Ok(buffer)
}
