//! Page metadata: title, authors, publish date and lead image.
//!
//! Every field is looked up through a chain of sources, most structured first
//! (JSON-LD, then Open Graph / Twitter cards, then plain markup). Metadata is
//! read from the raw page, before preprocessing strips `<script>` blocks.

use serde::Serialize;
use serde_json::Value;

use crate::Document;

/// Metadata gathered from one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    /// Every distinct author found, in source order.
    pub authors: Vec<String>,
    pub published_date: Option<String>,
    pub lead_image: Option<String>,
}

impl Metadata {
    /// Authors joined with `", "`, or `None` when there are none.
    pub fn author_line(&self) -> Option<String> {
        if self.authors.is_empty() { None } else { Some(self.authors.join(", ")) }
    }
}

/// Reads all metadata fields from `doc`.
pub fn extract_metadata(doc: &Document) -> Metadata {
    let json_ld = json_ld_objects(doc);
    Metadata {
        title: title(doc, &json_ld),
        authors: authors(doc, &json_ld),
        published_date: published_date(doc, &json_ld),
        lead_image: lead_image(doc, &json_ld),
    }
}

/// JSON-LD headline, og:title, twitter:title, meta title, `<title>`, first `<h1>`.
fn title(doc: &Document, json_ld: &[Value]) -> Option<String> {
    json_ld
        .iter()
        .find_map(|obj| obj.get("headline").and_then(Value::as_str).map(str::to_string))
        .or_else(|| meta_content(doc, "og:title"))
        .or_else(|| meta_content(doc, "twitter:title"))
        .or_else(|| meta_content(doc, "title"))
        .or_else(|| meta_content(doc, "DC.title"))
        .or_else(|| doc.title())
        .or_else(|| first_text(doc, "h1"))
}

/// JSON-LD authors win outright; markup sources are only consulted without them.
fn authors(doc: &Document, json_ld: &[Value]) -> Vec<String> {
    let mut names = Vec::new();
    for obj in json_ld {
        if let Some(author) = obj.get("author") {
            collect_author_names(author, &mut names);
        }
    }
    if !names.is_empty() {
        return dedup(names);
    }

    let from_markup = meta_content(doc, "author")
        .or_else(|| meta_content(doc, "article:author"))
        .or_else(|| meta_content(doc, "DC.creator"))
        .or_else(|| first_text(doc, r#"[rel="author"]"#))
        .or_else(|| first_text(doc, r#"[itemprop="author"]"#))
        .or_else(|| byline(doc));

    from_markup.into_iter().collect()
}

fn collect_author_names(value: &Value, names: &mut Vec<String>) {
    match value {
        Value::String(name) => push_name(names, name),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name").and_then(Value::as_str) {
                push_name(names, name);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_author_names(item, names)),
        _ => {}
    }
}

fn push_name(names: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() {
        names.push(name.to_string());
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Short text in an element whose class or id mentions a byline.
fn byline(doc: &Document) -> Option<String> {
    for pattern in ["byline", "author", "writer"] {
        for selector in [format!(r#"[class*="{pattern}"]"#), format!(r#"[id*="{pattern}"]"#)] {
            let Ok(elements) = doc.select(&selector) else { continue };
            let found = elements.iter().take(3).find_map(|el| {
                let text = el.text();
                let text = text.trim().trim_start_matches("By ").trim_start_matches("by ").trim();
                (!text.is_empty() && text.chars().count() < 100).then(|| text.to_string())
            });
            if found.is_some() {
                return found;
            }
        }
    }
    None
}

/// JSON-LD datePublished, article:published_time, `<time datetime>`, meta date.
fn published_date(doc: &Document, json_ld: &[Value]) -> Option<String> {
    json_ld
        .iter()
        .find_map(|obj| obj.get("datePublished").and_then(Value::as_str).map(str::to_string))
        .or_else(|| meta_content(doc, "article:published_time"))
        .or_else(|| {
            doc.select("time[datetime]")
                .ok()?
                .first()
                .and_then(|el| el.attr("datetime"))
                .map(str::to_string)
        })
        .or_else(|| meta_content(doc, "date"))
        .or_else(|| meta_content(doc, "DC.date"))
}

/// og:image, twitter:image, JSON-LD image, `link[rel=image_src]`.
///
/// The first image of the extracted content is the caller's last resort, since
/// only the caller knows which container won.
fn lead_image(doc: &Document, json_ld: &[Value]) -> Option<String> {
    let raw = meta_content(doc, "og:image")
        .or_else(|| meta_content(doc, "og:image:url"))
        .or_else(|| meta_content(doc, "twitter:image"))
        .or_else(|| json_ld.iter().find_map(|obj| obj.get("image").and_then(json_ld_image)))
        .or_else(|| {
            doc.select(r#"link[rel="image_src"]"#)
                .ok()?
                .first()
                .and_then(|el| el.attr("href"))
                .map(str::to_string)
        })?;

    Some(absolutize(doc, &raw))
}

/// `image` may be a URL string, an ImageObject or a list of either.
fn json_ld_image(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => Some(url.clone()),
        Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(json_ld_image),
        _ => None,
    }
}

pub(crate) fn absolutize(doc: &Document, raw: &str) -> String {
    doc.base_url()
        .and_then(|base| base.join(raw.trim()).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Content of `<meta name=..>` or `<meta property=..>`, skipping blank values.
fn meta_content(doc: &Document, key: &str) -> Option<String> {
    ["name", "property"].iter().find_map(|attr| {
        doc.select(&format!(r#"meta[{attr}="{key}"]"#))
            .ok()?
            .iter()
            .filter_map(|el| el.attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn first_text(doc: &Document, selector: &str) -> Option<String> {
    doc.select(selector).ok()?.iter().map(|el| el.text().trim().to_string()).find(|text| !text.is_empty())
}

/// Every JSON object in the page's `ld+json` scripts, flattening top-level
/// arrays and `@graph` lists.
fn json_ld_objects(doc: &Document) -> Vec<Value> {
    let Ok(scripts) = doc.select(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut objects = Vec::new();
    for script in scripts {
        let Ok(value) = serde_json::from_str::<Value>(script.text().trim()) else {
            tracing::debug!("skipping malformed JSON-LD block");
            continue;
        };
        flatten_json_ld(value, &mut objects);
    }
    objects
}

fn flatten_json_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|item| flatten_json_ld(item, out)),
        Value::Object(mut obj) => {
            if let Some(graph) = obj.remove("@graph") {
                flatten_json_ld(graph, out);
            }
            out.push(Value::Object(obj));
        }
        _ => {}
    }
}
