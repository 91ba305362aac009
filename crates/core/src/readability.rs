//! The primary extraction strategy.
//!
//! [`Readability`] runs the full pipeline over a page: metadata from the raw
//! HTML, then preprocessing, candidate scoring and cleanup for the body.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::Readability;
//!
//! let paragraph = "A paragraph of real prose, with commas, clauses and plenty of words to score. ".repeat(4);
//! let html = format!(
//!     "<html><head><title>Post</title></head><body><article class=\"post\"><p>{paragraph}</p></article></body></html>"
//! );
//! let article = Readability::new().parse_with_url(&html, "https://example.com/post").unwrap();
//! assert_eq!(article.metadata.title.as_deref(), Some("Post"));
//! assert!(article.text_content.starts_with("A paragraph of real prose"));
//! ```

use url::Url;

use crate::article::Article;
use crate::extract::{ExtractConfig, extract_content};
use crate::metadata::extract_metadata;
use crate::parse::Document;
use crate::postprocess::PostProcessConfig;
use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::{Result, ShelfmarkError};

/// Tuning for [`Readability`].
///
/// ```rust
/// use shelfmark_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder().min_score(25.0).preserve_images(false).build();
/// assert_eq!(config.min_score, 25.0);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score of the winning container (default: 10.0).
    pub min_score: f64,

    /// Character threshold; containers under a tenth of it are not scored (default: 250).
    pub char_threshold: usize,

    /// Maximum elements to score, 0 for unlimited (default: 1000).
    pub max_elems_to_parse: usize,

    /// Unwrap elements whose class or id looks like page chrome (default: true).
    pub remove_unlikely: bool,

    /// Keep `class` attributes in the cleaned HTML (default: false).
    pub keep_classes: bool,

    /// Keep images in the cleaned HTML (default: true).
    pub preserve_images: bool,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            min_score: 10.0,
            char_threshold: 250,
            max_elems_to_parse: 1000,
            remove_unlikely: true,
            keep_classes: false,
            preserve_images: true,
        }
    }
}

impl ReadabilityConfig {
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::default()
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            min_score_threshold: self.min_score,
            char_threshold: self.char_threshold,
            max_elements: self.max_elems_to_parse,
            postprocess: PostProcessConfig {
                strip_images: !self.preserve_images,
                keep_classes: self.keep_classes,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Fluent builder for [`ReadabilityConfig`].
#[derive(Debug, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    pub fn min_score(mut self, value: f64) -> Self {
        self.config.min_score = value;
        self
    }

    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    pub fn remove_unlikely(mut self, value: bool) -> Self {
        self.config.remove_unlikely = value;
        self
    }

    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    pub fn preserve_images(mut self, value: bool) -> Self {
        self.config.preserve_images = value;
        self
    }

    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// Readability-style article extraction over HTML that is already in hand.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    /// Extracts the article from `html` with no base URL.
    ///
    /// # Errors
    ///
    /// [`ShelfmarkError::NoContent`] or [`ShelfmarkError::NotReadable`] when no
    /// body text can be found.
    pub fn parse(&self, html: &str) -> Result<Article> {
        self.extract(html, None)
    }

    /// Extracts the article from `html`, resolving relative links against `url`.
    ///
    /// # Errors
    ///
    /// [`ShelfmarkError::InvalidUrl`] if `url` does not parse, otherwise as
    /// [`Readability::parse`].
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let base_url = Url::parse(url).map_err(|e| ShelfmarkError::InvalidUrl(e.to_string()))?;
        self.extract(html, Some(base_url))
    }

    fn extract(&self, html: &str, base_url: Option<Url>) -> Result<Article> {
        let mut raw = Document::parse(html)?;
        if let Some(url) = base_url.clone() {
            raw.set_base_url(url);
        }
        let metadata = extract_metadata(&raw);

        let preprocess = PreprocessConfig {
            remove_unlikely: self.config.remove_unlikely,
            base_url: base_url.clone(),
            ..Default::default()
        };
        let cleaned = Document::parse(&preprocess_html(html, &preprocess))?;
        let extracted = extract_content(&cleaned, &self.config.extract_config())?;

        let article = Article::new(extracted.content, metadata, base_url.map(String::from));
        if article.text_content.trim().is_empty() {
            return Err(ShelfmarkError::NoContent);
        }
        Ok(article)
    }
}

/// [`Readability::parse_with_url`] with default settings.
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Readability::new().parse_with_url(html, url)
}
