//! Streaming cleanup applied before the readability pass.
//!
//! Everything happens in a single `lol_html` rewrite: non-content tags and
//! comments are dropped, hidden nodes removed, unlikely wrappers unwrapped
//! and relative links made absolute against the page URL.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Tags whose whole subtree never carries article text.
const STRIPPED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg", "canvas", "template"];

pub(crate) static UNLIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|share|social|newsletter)",
    )
    .expect("static regex")
});

pub(crate) static LIKELY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)").expect("static regex")
});

static HIDDEN_STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("static regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Options for [`preprocess_html`].
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Unwrap elements whose id/class looks like chrome (menus, footers, ads).
    pub remove_unlikely: bool,
    /// Spare unlikely-looking elements that also look like content.
    pub keep_positive: bool,
    /// Drop elements hidden with inline styles or the `hidden` attribute.
    pub remove_hidden: bool,
    /// Base URL for absolutizing `href`/`src`.
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_unlikely: true, keep_positive: true, remove_hidden: true, base_url: None }
    }
}

/// Cleans raw page HTML for scoring.
///
/// On a rewriter error the input is returned untouched (minus whitespace
/// normalization) so extraction can still try its luck.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let rewritten = rewrite(html, config).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "preprocess rewrite failed, using raw html");
        html.to_string()
    });
    WHITESPACE.replace_all(&rewritten, " ").into_owned()
}

fn rewrite(html: &str, config: &PreprocessConfig) -> Result<String, lol_html::errors::RewritingError> {
    let base_url = config.base_url.as_ref();

    let mut handlers = Vec::new();
    for tag in STRIPPED_TAGS {
        handlers.push(lol_html::element!(*tag, |el| {
            el.remove();
            Ok(())
        }));
    }

    if config.remove_hidden {
        handlers.push(lol_html::element!("*", |el| {
            let hidden_style = el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE.is_match(&style));
            if hidden_style || el.has_attribute("hidden") {
                el.remove();
            }
            Ok(())
        }));
    }

    if config.remove_unlikely {
        let keep_positive = config.keep_positive;
        handlers.push(lol_html::element!("*", move |el| {
            if el.removed() {
                return Ok(());
            }
            let tag = el.tag_name();
            if matches!(tag.as_str(), "html" | "body" | "article" | "main" | "a") {
                return Ok(());
            }
            let looks_unlikely = |value: &str| UNLIKELY.is_match(value) && !(keep_positive && LIKELY.is_match(value));
            let id_unlikely = el.get_attribute("id").is_some_and(|id| looks_unlikely(&id));
            let class_unlikely =
                el.get_attribute("class").is_some_and(|class| class.split_whitespace().any(looks_unlikely));
            if id_unlikely || class_unlikely {
                el.remove_and_keep_content();
            }
            Ok(())
        }));
    }

    if let Some(base) = base_url {
        for selector in ["a[href]", "link[href]"] {
            handlers.push(lol_html::element!(selector, move |el| {
                absolutize(el, "href", base);
                Ok(())
            }));
        }
        handlers.push(lol_html::element!("img[src]", move |el| {
            absolutize(el, "src", base);
            Ok(())
        }));
    }

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: handlers,
            document_content_handlers: vec![lol_html::doc_comments!(|c| {
                c.remove();
                Ok(())
            })],
            ..Default::default()
        },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn absolutize(el: &mut lol_html::html_content::Element<'_, '_>, attr: &str, base: &Url) {
    if let Some(value) = el.get_attribute(attr)
        && let Ok(absolute) = base.join(value.trim())
    {
        el.set_attribute(attr, absolute.as_str()).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_non_content_tags() {
        let html = r#"
            <html>
                <head><script>alert('test');</script><style>body{color:red;}</style></head>
                <body>
                    <noscript>Enable JavaScript</noscript>
                    <iframe src="https://ads.example.com"></iframe>
                    <svg><rect width="100" height="100"/></svg>
                    <p>Content</p>
                </body>
            </html>
        "#;

        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(!result.contains("alert"));
        assert!(!result.contains("color:red"));
        assert!(!result.contains("Enable JavaScript"));
        assert!(!result.contains("ads.example.com"));
        assert!(!result.contains("rect"));
        assert!(result.contains("<p>Content</p>"));
    }

    #[test]
    fn test_removes_comments() {
        let html = "<body><!-- hidden note --><p>Visible content</p></body>";
        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(!result.contains("<!--"));
        assert!(!result.contains("hidden note"));
        assert!(result.contains("Visible content"));
    }

    #[test]
    fn test_unwraps_unlikely_candidates() {
        let html = r#"<body><div id="sidebar">Sidebar text</div><div class="post-content">Main</div></body>"#;
        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(!result.contains("id=\"sidebar\""));
        assert!(result.contains("Sidebar text"));
        assert!(result.contains("post-content"));
    }

    #[test]
    fn test_keep_positive_spares_mixed_classes() {
        let html = r#"<div class="comment-content">Body</div>"#;
        let kept = preprocess_html(html, &PreprocessConfig::default());
        assert!(kept.contains("comment-content"));

        let config = PreprocessConfig { keep_positive: false, ..Default::default() };
        let dropped = preprocess_html(html, &config);
        assert!(!dropped.contains("comment-content"));
    }

    #[test]
    fn test_removes_hidden_elements() {
        let html = r#"<div style="display: none">Secret</div><p hidden>Also secret</p><p>Shown</p>"#;
        let result = preprocess_html(html, &PreprocessConfig::default());
        assert!(!result.contains("Secret"));
        assert!(!result.contains("Also secret"));
        assert!(result.contains("Shown"));
    }

    #[test]
    fn test_absolutizes_urls() {
        let base = Url::parse("https://example.com/posts/one").unwrap();
        let html = r#"<a href="/about">About</a><img src="img/lead.png">"#;
        let config = PreprocessConfig { base_url: Some(base), ..Default::default() };
        let result = preprocess_html(html, &config);
        assert!(result.contains(r#"href="https://example.com/about""#));
        assert!(result.contains(r#"src="https://example.com/posts/img/lead.png""#));
    }

    #[test]
    fn test_normalizes_whitespace() {
        let result = preprocess_html("<p>a   \n\n  b</p>", &PreprocessConfig::default());
        assert!(result.contains("<p>a b</p>"));
    }
}
