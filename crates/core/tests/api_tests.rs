//! Library API integration tests
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::rstest;
use shelfmark_core::*;

fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
}

const NEWS_URL: &str = "https://news.example.com/2024/06/lighthouse";

/// Serves scripted responses in order, then fails.
struct StubFetcher {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<usize>,
}

impl StubFetcher {
    fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self { responses: Mutex::new(responses.into()), calls: Mutex::new(0) })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, _url: &str, _config: &FetchConfig) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        self.responses.lock().unwrap().pop_front().unwrap_or(Err(ShelfmarkError::NoContent))
    }
}

#[test]
fn test_news_article_body() {
    let article = parse_with_url(&fixture("news_article.html"), NEWS_URL).expect("should parse");

    assert!(article.text_content.contains("North Point lighthouse"));
    assert!(article.text_content.contains("before construction starts"));
    assert!(!article.text_content.contains("Ferry schedule"));
    assert!(!article.text_content.contains("Copyright"));
    assert!(!article.text_content.contains("waste of money"));
    assert!(!article.content.contains("<script"));
}

#[test]
fn test_news_article_record() {
    let record = parse_with_url(&fixture("news_article.html"), NEWS_URL).expect("should parse").into_record();

    assert_eq!(record.title, "Harbor Town Votes to Restore Its Lighthouse");
    assert_eq!(record.author.as_deref(), Some("Maren Holt, Idris Calloway"));
    assert_eq!(record.published_date.as_deref(), Some("2024-06-03T09:15:00Z"));
    assert_eq!(record.top_image.as_deref(), Some("https://news.example.com/media/lighthouse-lead.jpg"));
    assert!(record.content.contains("\n\n"), "paragraphs are separated by blank lines");
}

#[test]
fn test_blog_post_metadata_from_markup() {
    let record = parse_with_url(&fixture("blog_post.html"), "https://blog.example.org/sourdough")
        .expect("should parse")
        .into_record();

    assert_eq!(record.title, "Notes on sourdough hydration");
    assert_eq!(record.author.as_deref(), Some("Tomasz Wren"));
    assert_eq!(record.published_date, None);
    assert_eq!(record.top_image.as_deref(), Some("https://blog.example.org/images/loaf.png"));
    assert!(record.content.contains("bench scraper"));
    assert!(!record.content.contains("Share"));
}

#[rstest]
#[case("plain_page.html")]
#[case("navigation_only.html")]
fn test_unreadable_pages_fail_primary(#[case] name: &str) {
    let result = Readability::new().parse_with_url(&fixture(name), "https://example.com/");
    assert!(matches!(result, Err(ShelfmarkError::NoContent | ShelfmarkError::NotReadable { .. })));
}

#[test]
fn test_readability_builder() {
    let config = ReadabilityConfig::builder().min_score(5.0).char_threshold(300).keep_classes(true).build();
    let article = Readability::with_config(config).parse(&fixture("news_article.html")).expect("should parse");
    assert!(!article.content.is_empty());
}

#[test]
fn test_document_api() {
    let doc = Document::parse(&fixture("news_article.html")).expect("should parse");
    assert_eq!(doc.title().as_deref(), Some("Harbor Town Votes to Restore Its Lighthouse | The Coastal Ledger"));

    let metadata = extract_metadata(&doc);
    assert_eq!(metadata.authors.len(), 2);
}

#[tokio::test]
async fn test_fallback_after_primary_failure() {
    let fetcher = StubFetcher::new(vec![
        Err(ShelfmarkError::Timeout { timeout: 30 }),
        Ok(fixture("plain_page.html")),
    ]);
    let extractor = Extractor::with_fetcher(fetcher.clone(), ExtractorConfig::default());

    let record = extractor.extract("https://shop.example.com/notice").await.expect("fallback should succeed");

    assert_eq!(record.title, "Closing Notice");
    assert_eq!(record.content, "We are closed. Back Monday. Thanks!");
    assert_eq!(record.author, None);
    assert_eq!(record.published_date, None);
    assert_eq!(record.top_image, None);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_unreadable_page_falls_back_to_scrape() {
    let page = fixture("plain_page.html");
    let fetcher = StubFetcher::new(vec![Ok(page.clone()), Ok(page)]);
    let extractor = Extractor::with_fetcher(fetcher, ExtractorConfig::default());

    let record = extractor.extract("https://shop.example.com/notice").await.unwrap();
    assert_eq!(record.title, "Closing Notice");
}

#[tokio::test]
async fn test_failure_reports_fallback_kind() {
    let fetcher = StubFetcher::new(vec![
        Err(ShelfmarkError::HttpStatus { status: 500 }),
        Err(ShelfmarkError::Timeout { timeout: 10 }),
    ]);
    let extractor = Extractor::with_fetcher(fetcher, ExtractorConfig::default());

    let failure = extractor.extract(NEWS_URL).await.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.url, NEWS_URL);
}

#[tokio::test]
async fn test_primary_record_from_fetched_page() {
    let fetcher = StubFetcher::new(vec![Ok(fixture("news_article.html"))]);
    let extractor = Extractor::with_fetcher(fetcher.clone(), ExtractorConfig::default());

    let record = extractor.extract(NEWS_URL).await.unwrap();
    assert_eq!(record.author.as_deref(), Some("Maren Holt, Idris Calloway"));
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_extract_html_matches_fallback_scrape() {
    let html = fixture("plain_page.html");
    let extractor = Extractor::new(ExtractorConfig::default());

    let via_extractor = extractor.extract_html(&html, "https://e.com/n").unwrap();
    let direct = fallback::scrape(&html, "https://e.com/n").unwrap();
    assert_eq!(via_extractor, direct);
}

#[tokio::test(flavor = "current_thread")]
async fn test_large_page_parsed_off_the_runtime() {
    let block = "<div><p>Long form prose, with commas, clauses and a <a href=\"/x\">link</a> to keep it honest.</p></div>";
    let page = format!(
        "<html><head><title>Long Read</title></head><body><article><section>{}</section></article></body></html>",
        block.repeat(4000)
    );
    let fetcher = StubFetcher::new(vec![Ok(page)]);
    let extractor = Extractor::with_fetcher(fetcher, ExtractorConfig::default());

    let ticks = Arc::new(AtomicUsize::new(0));
    let ticker = tokio::spawn({
        let ticks = ticks.clone();
        async move {
            loop {
                ticks.fetch_add(1, Ordering::Relaxed);
                tokio::task::yield_now().await;
            }
        }
    });

    let record = extractor.extract("https://e.com/long").await.unwrap();
    let seen = ticks.load(Ordering::Relaxed);
    ticker.abort();

    assert_eq!(record.title, "Long Read");
    assert!(record.content.starts_with("Long form prose"));
    assert!(seen > 0, "runtime made no progress while the page was parsed");
}
