//! Article extraction for Shelfmark.
//!
//! Turns a URL (or HTML already in hand) into an [`ArticleRecord`]: title,
//! plain-text body, authors, publish date and lead image. [`Extractor`] tries
//! the readability pipeline first and falls back to a plain scrape.

pub mod article;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod fallback;
pub mod fetch;
pub mod metadata;
pub mod parse;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod scoring;

pub use article::{Article, ArticleRecord};
pub use error::{Result, ShelfmarkError};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use extractor::{ExtractionFailure, Extractor, ExtractorConfig, FailureKind};
pub use fetch::{FetchConfig, HttpFetcher, PageFetcher, fetch_file, fetch_stdin, parse_http_url};
pub use metadata::{Metadata, extract_metadata};
pub use parse::{Document, Element};
#[doc(hidden)]
pub use postprocess::{PostProcessConfig, html_to_text, postprocess_html};
#[doc(hidden)]
pub use preprocess::{PreprocessConfig, preprocess_html};
pub use readability::{Readability, ReadabilityConfig, ReadabilityConfigBuilder, parse_with_url};
#[doc(hidden)]
pub use scoring::{Score, ScoreConfig, score_element};
