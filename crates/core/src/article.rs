//! Extraction results.
//!
//! [`Article`] is what the readability pass produces: cleaned HTML, its plain
//! text rendering and the page metadata. [`ArticleRecord`] is the normalized
//! shape both extraction strategies hand to callers, and the one the server
//! persists.

use serde::{Deserialize, Serialize};

use crate::Metadata;
use crate::parse::Document;
use crate::postprocess::html_to_text;

/// Result of a readability pass over one page.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    /// Cleaned HTML of the main content.
    pub content: String,

    /// Plain text of `content`, paragraphs separated by blank lines.
    pub text_content: String,

    pub metadata: Metadata,

    pub source_url: Option<String>,
}

impl Article {
    /// Builds an article and derives its plain text.
    ///
    /// When the page metadata names no lead image, the first `<img>` inside
    /// the content is used instead.
    pub fn new(content: String, mut metadata: Metadata, source_url: Option<String>) -> Self {
        let text_content = html_to_text(&content);

        if metadata.lead_image.is_none() {
            metadata.lead_image = first_image(&content);
        }

        Self { content, text_content, metadata, source_url }
    }

    /// Normalizes the article into the record handed to callers.
    ///
    /// A page without any title source is titled with its URL.
    pub fn into_record(self) -> ArticleRecord {
        let author = self.metadata.author_line();
        let title = self.metadata.title.or(self.source_url).unwrap_or_default();

        ArticleRecord {
            title,
            content: self.text_content,
            author,
            published_date: self.metadata.published_date,
            top_image: self.metadata.lead_image,
        }
    }
}

fn first_image(content_html: &str) -> Option<String> {
    let doc = Document::parse(content_html).ok()?;
    doc.select("img[src]")
        .ok()?
        .iter()
        .filter_map(|img| img.attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(str::to_string)
}

/// A normalized article, whichever strategy produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Page title; may be empty or whitespace, it is not normalized.
    pub title: String,
    /// Plain-text body.
    pub content: String,
    /// Authors joined with `", "`.
    pub author: Option<String>,
    /// Publish date exactly as the page states it.
    pub published_date: Option<String>,
    /// Absolute URL of the lead image.
    pub top_image: Option<String>,
}
