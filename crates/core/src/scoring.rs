//! Per-element content scores used to pick the article container.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

static POSITIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story)").expect("static regex")
});

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|share|social|widget)",
    )
    .expect("static regex")
});

/// Weights for [`score_element`].
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Added when class/id looks like content.
    pub positive_weight: f64,
    /// Added when class/id looks like chrome.
    pub negative_weight: f64,
    /// Cap on the points earned from text length.
    pub max_length_points: f64,
    /// Cap on the points earned from commas.
    pub max_comma_points: f64,
    /// Characters of text per length point.
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_length_points: 3.0,
            max_comma_points: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Breakdown of one element's score.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub tag_points: f64,
    pub class_weight: f64,
    pub density_points: f64,
    pub link_density: f64,
    pub total: f64,
}

/// Points for how likely a tag is to wrap main content.
pub fn tag_points(tag: &str) -> f64 {
    match tag {
        "article" => 10.0,
        "section" | "main" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" | "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" | "aside" => -5.0,
        _ => 0.0,
    }
}

/// Positive or negative weight from the element's id, then its classes.
pub fn class_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let id = element.attr("id").into_iter();
    let classes = element.attr("class").into_iter().flat_map(str::split_whitespace);

    for name in id.chain(classes) {
        if POSITIVE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE.is_match(name) {
            return config.negative_weight;
        }
    }
    0.0
}

/// Ratio of link text to all text, 0.0 for an element without text.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_len = element.text().chars().count();
    if text_len == 0 {
        return 0.0;
    }

    let link_len: usize =
        element.select("a").unwrap_or_default().iter().map(|link| link.text().chars().count()).sum();
    link_len as f64 / text_len as f64
}

fn density_points(text: &str, config: &ScoreConfig) -> f64 {
    let length = ((text.chars().count() / config.chars_per_point.max(1)) as f64).min(config.max_length_points);
    let commas = (text.matches(',').count() as f64).min(config.max_comma_points);
    length + commas
}

/// `<pre>` blocks full of punctuation and few spaces are code listings.
fn looks_like_code(tag: &str, text: &str) -> bool {
    if tag != "pre" || text.len() <= 50 {
        return false;
    }
    let len = text.len() as f64;
    let commas = text.matches(',').count() as f64 / len;
    let spaces = text.matches(' ').count() as f64 / len;
    let symbols = text.chars().filter(|c| !c.is_alphanumeric() && !c.is_whitespace()).count() as f64 / len;
    symbols > 0.15 && commas < 0.01 && spaces < 0.15
}

/// Scores an element.
///
/// Link density scales the raw score down; elements that already look like
/// content (positive class or over 500 characters) only pay half of it.
pub fn score_element(element: &Element<'_>, config: &ScoreConfig) -> Score {
    let tag = element.tag_name();
    let text = element.text();

    let tag_points = tag_points(&tag);
    let class_weight = class_weight(element, config);
    let density_points = density_points(&text, config);
    let link_density = link_density(element);

    let code_penalty = if looks_like_code(&tag, &text) { -10.0 } else { 0.0 };
    let forgiving = class_weight > 0.0 || text.chars().count() > 500;
    let link_factor = if forgiving { 1.0 - link_density * 0.5 } else { 1.0 - link_density };

    let total = (tag_points + class_weight + density_points + code_penalty) * link_factor;

    Score { tag_points, class_weight, density_points, link_density, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;
    use rstest::rstest;

    fn first<'a>(doc: &'a Document, selector: &str) -> Element<'a> {
        doc.select(selector).unwrap().remove(0)
    }

    #[rstest]
    #[case("article", 10.0)]
    #[case("section", 8.0)]
    #[case("div", 5.0)]
    #[case("blockquote", 3.0)]
    #[case("li", -3.0)]
    #[case("nav", -5.0)]
    #[case("span", 0.0)]
    fn test_tag_points(#[case] tag: &str, #[case] expected: f64) {
        assert_eq!(tag_points(tag), expected);
    }

    #[rstest]
    #[case(r#"<div class="post-body">x</div>"#, 25.0)]
    #[case(r#"<div id="sidebar">x</div>"#, -25.0)]
    #[case(r#"<div class="widget main-content">x</div>"#, -25.0)]
    #[case(r#"<div class="plain">x</div>"#, 0.0)]
    fn test_class_weight(#[case] html: &str, #[case] expected: f64) {
        let doc = Document::parse(html).unwrap();
        assert_eq!(class_weight(&first(&doc, "div"), &ScoreConfig::default()), expected);
    }

    #[test]
    fn test_id_wins_over_class() {
        let doc = Document::parse(r#"<div id="story" class="sidebar">x</div>"#).unwrap();
        assert_eq!(class_weight(&first(&doc, "div"), &ScoreConfig::default()), 25.0);
    }

    #[test]
    fn test_link_density() {
        let doc = Document::parse(r#"<div>abcde<a href="/x">fghij</a></div>"#).unwrap();
        assert!((link_density(&first(&doc, "div")) - 0.5).abs() < f64::EPSILON);

        let empty = Document::parse("<div></div>").unwrap();
        assert_eq!(link_density(&first(&empty, "div")), 0.0);
    }

    #[test]
    fn test_prose_outscores_link_list() {
        let prose = format!("<div>{}</div>", "A sentence, with commas, and more words. ".repeat(20));
        let links = format!("<div>{}</div>", r#"<a href="/a">A link to somewhere else</a> "#.repeat(20));
        let prose_doc = Document::parse(&prose).unwrap();
        let links_doc = Document::parse(&links).unwrap();
        let config = ScoreConfig::default();

        let prose_score = score_element(&first(&prose_doc, "div"), &config);
        let links_score = score_element(&first(&links_doc, "div"), &config);

        assert!(prose_score.total > links_score.total);
        assert!(links_score.link_density > 0.9);
    }

    #[test]
    fn test_code_listing_penalized() {
        let code = "fn main(){let x=vec![1;2];for v in x.iter(){println!(\"{v:?}\");}while x.is_empty(){break;}}";
        let doc = Document::parse(&format!("<pre>{}</pre>", code)).unwrap();
        let score = score_element(&first(&doc, "pre"), &ScoreConfig::default());
        assert!(score.total < 0.0);
    }
}
