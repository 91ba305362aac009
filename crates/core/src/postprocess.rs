//! Cleanup of the extracted container and conversion to stored text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Options for [`postprocess_html`].
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Remove elements left without text or media.
    pub remove_empty_nodes: bool,
    /// Upper bound on empty-node sweeps; each sweep can expose new empties.
    pub max_empty_node_passes: usize,
    /// Remove blocks dominated by links (inline menus, tag clouds).
    pub remove_high_link_density: bool,
    /// Link density above which a block is dropped.
    pub max_link_density: f64,
    /// Drop `<img>` tags.
    pub strip_images: bool,
    /// Keep `class` attributes.
    pub keep_classes: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            remove_high_link_density: true,
            max_link_density: 0.5,
            strip_images: false,
            keep_classes: false,
        }
    }
}

const FORM_TAGS: &[&str] = &["form", "button", "input", "select", "textarea", "label"];
const LINK_HEAVY_TAGS: &[&str] = &["div", "section", "aside", "nav", "ul", "ol", "p", "li"];
const EMPTY_CANDIDATES: &str = "div|p|span|section|article|aside|nav|header|footer|li|ul|ol";
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "aside", "blockquote", "pre", "ul", "ol", "li",
    "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "figure", "figcaption", "dl", "dt", "dd", "hr",
];

static EMPTY_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"<({EMPTY_CANDIDATES})(?:\s[^>]*)?>(?:\s|&nbsp;|<br\s*/?>)*</({EMPTY_CANDIDATES})>"))
        .expect("static regex")
});

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f\x0B]+").expect("static regex"));

/// Cleans the HTML of the selected container and its siblings.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = strip_attributes_and_forms(html, config);

    if config.remove_high_link_density {
        processed = remove_link_heavy_blocks(&processed, config.max_link_density);
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    processed
}

fn strip_attributes_and_forms(html: &str, config: &PostProcessConfig) -> String {
    let mut handlers = Vec::new();
    for tag in FORM_TAGS {
        handlers.push(lol_html::element!(*tag, |el| {
            el.remove();
            Ok(())
        }));
    }
    if config.strip_images {
        for tag in ["img", "picture"] {
            handlers.push(lol_html::element!(tag, |el| {
                el.remove();
                Ok(())
            }));
        }
    }
    let keep_classes = config.keep_classes;
    handlers.push(lol_html::element!("*", move |el| {
        el.remove_attribute("style");
        el.remove_attribute("onclick");
        if !keep_classes {
            el.remove_attribute("class");
        }
        Ok(())
    }));

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |chunk: &[u8]| output.extend_from_slice(chunk),
    );
    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }
    String::from_utf8_lossy(&output).into_owned()
}

/// Drops link-dominated blocks, outermost first.
///
/// Once a block is dropped its descendants are not inspected. The blocks are
/// detached from the parsed fragment and the remaining tree is serialized.
fn remove_link_heavy_blocks(html: &str, max_density: f64) -> String {
    let mut fragment = Html::parse_fragment(html);

    let doomed = {
        let mut doomed = Vec::new();
        let mut pending: Vec<ElementRef<'_>> =
            fragment.root_element().children().filter_map(ElementRef::wrap).collect();
        while let Some(element) = pending.pop() {
            if LINK_HEAVY_TAGS.contains(&element.value().name()) && is_link_heavy(element, max_density) {
                doomed.push(element.id());
                continue;
            }
            pending.extend(element.children().filter_map(ElementRef::wrap));
        }
        doomed
    };

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    fragment.root_element().inner_html()
}

fn is_link_heavy(element: ElementRef<'_>, max_density: f64) -> bool {
    let text_len = element.text().collect::<String>().trim().chars().count();
    if text_len == 0 {
        return false;
    }
    let link_len: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|d| d.value().name() == "a")
        .map(|a| a.text().collect::<String>().trim().chars().count())
        .sum();
    link_len as f64 / text_len as f64 > max_density
}

/// Repeatedly removes empty wrappers until nothing changes.
fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();
    for _ in 0..max_passes {
        let next = EMPTY_NODE
            .replace_all(&result, |caps: &regex::Captures| {
                if caps[1] == caps[2] { String::new() } else { caps[0].to_string() }
            })
            .into_owned();
        if next == result {
            break;
        }
        result = next;
    }
    result
}

/// Renders cleaned HTML as plain text.
///
/// Block elements become paragraphs separated by a blank line, `<br>` becomes
/// a newline, and runs of inline whitespace collapse to one space.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::new();
    render(fragment.root_element(), &mut raw);

    raw.split("\n\n")
        .map(|block| {
            block.lines().map(|line| INLINE_SPACE.replace_all(line.trim(), " ").into_owned()).collect::<Vec<_>>()
        })
        .map(|lines| lines.into_iter().filter(|l| !l.is_empty()).collect::<Vec<_>>().join("\n"))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(el) => {
                let Some(child_ref) = ElementRef::wrap(child) else { continue };
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                } else if BLOCK_TAGS.contains(&name) {
                    out.push_str("\n\n");
                    render(child_ref, out);
                    out.push_str("\n\n");
                } else {
                    render(child_ref, out);
                }
            }
            _ => {}
        }
    }
}
