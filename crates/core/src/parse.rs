//! HTML parsing and DOM navigation.
//!
//! [`Document`] and [`Element`] wrap `scraper` so the rest of the crate can
//! query pages with CSS selectors and walk up the tree without touching
//! `scraper` types directly.
//!
//! # Example
//!
//! ```rust
//! use shelfmark_core::Document;
//!
//! let doc = Document::parse("<html><head><title>Test</title></head><body><p>Hi</p></body></html>").unwrap();
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select("p").unwrap()[0].text(), "Hi");
//! ```

use std::hash::Hash;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::{Result, ShelfmarkError};

/// A parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML exactly as given, scripts and boilerplate included.
    pub fn parse(html: &str) -> Result<Self> {
        let html = Html::parse_document(html);
        Ok(Self { html, base_url: None })
    }

    /// The base URL set with [`Document::set_base_url`], if any.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Sets the URL that relative links in this document resolve against.
    pub fn set_base_url(&mut self, url: Url) {
        self.base_url = Some(url);
    }

    /// Selects elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfmarkError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).map(|element| Element { element }).collect())
    }

    /// Text of the first `<title>` element, untrimmed.
    ///
    /// A document with an empty `<title></title>` yields `Some("")`, which is
    /// different from having no title element at all.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html.select(&selector).next().map(|el| el.text().collect::<String>())
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ShelfmarkError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// A single element inside a [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Inner HTML, excluding the element's own tags.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Outer HTML, including the element's own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenation of all text nodes below this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Identity of this node within its document, usable as a map key.
    pub fn node_key(&self) -> impl Hash + Eq + Copy + use<> {
        self.element.id()
    }

    /// Nearest ancestor that is an element.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(|element| Element { element })
    }

    /// Element children in document order.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(|element| Element { element }).collect()
    }

    /// Whether both handles point at the same node.
    pub fn same_node(&self, other: &Element<'_>) -> bool {
        self.element.id() == other.element.id()
    }

    /// Selects descendants using a CSS selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile(selector)?;
        Ok(self.element.select(&sel).map(|element| Element { element }).collect())
    }
}
