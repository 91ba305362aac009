//! The fallback extraction strategy.
//!
//! No scoring and no cleanup: the page title (or the URL when the page has
//! none) and the text of the first paragraphs and article containers, in
//! document order. Author, date and image are never filled in.

use crate::article::ArticleRecord;
use crate::parse::Document;
use crate::Result;

/// Elements whose text makes up the fallback body.
const BODY_SELECTOR: &str = "p, article";

/// How many body elements are read.
pub const MAX_BODY_ELEMENTS: usize = 20;

/// Scrapes `html` fetched from `url`.
///
/// The title is taken verbatim from `<title>`, whitespace included. Content
/// is the text of the first [`MAX_BODY_ELEMENTS`] `<p>`/`<article>` elements
/// joined with single spaces, and is empty when there are none.
pub fn scrape(html: &str, url: &str) -> Result<ArticleRecord> {
    let doc = Document::parse(html)?;

    let title = doc.title().unwrap_or_else(|| url.to_string());
    let content = doc
        .select(BODY_SELECTOR)?
        .iter()
        .take(MAX_BODY_ELEMENTS)
        .map(|el| el.text())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(ArticleRecord { title, content, author: None, published_date: None, top_image: None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_paragraphs() {
        let html = r#"<html><head><title>Plain Page</title></head>
            <body><p>First.</p><div>skipped</div><p>Second.</p><p>Third.</p></body></html>"#;
        let record = scrape(html, "https://example.com/plain").unwrap();

        assert_eq!(record.title, "Plain Page");
        assert_eq!(record.content, "First. Second. Third.");
        assert_eq!(record.author, None);
        assert_eq!(record.published_date, None);
        assert_eq!(record.top_image, None);
    }

    #[test]
    fn test_missing_title_uses_url() {
        let record = scrape("<html><body><p>Body</p></body></html>", "https://example.com/untitled").unwrap();
        assert_eq!(record.title, "https://example.com/untitled");
    }

    #[test]
    fn test_whitespace_title_kept() {
        let record = scrape("<html><head><title>  </title></head><body></body></html>", "https://e.com").unwrap();
        assert_eq!(record.title, "  ");
    }

    #[test]
    fn test_no_body_elements_gives_empty_content() {
        let record = scrape("<html><body><div>Only a div</div></body></html>", "https://e.com").unwrap();
        assert_eq!(record.content, "");
    }

    #[test]
    fn test_reads_at_most_twenty_elements() {
        let body: String = (1..=25).map(|i| format!("<p>p{i}</p>")).collect();
        let html = format!("<html><body>{body}</body></html>");
        let record = scrape(&html, "https://e.com").unwrap();

        assert!(record.content.ends_with("p20"));
        assert!(!record.content.contains("p21"));
    }

    #[test]
    fn test_articles_and_paragraphs_in_document_order() {
        let html = "<html><body><p>lead</p><article>story</article><p>tail</p></body></html>";
        let record = scrape(html, "https://e.com").unwrap();
        assert_eq!(record.content, "lead story tail");
    }
}
