//! Main-content detection.
//!
//! Candidate containers are scored, their scores flow up to the parent
//! (half) and grandparent (a third), the best one wins and qualifying
//! siblings under the same parent are pulled in alongside it.

use std::collections::HashMap;

use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{ScoreConfig, link_density, score_element};
use crate::{Result, ShelfmarkError};

/// Tags that may wrap article content.
const CANDIDATE_TAGS: &[&str] = &["div", "article", "section", "main", "p", "td", "pre", "blockquote"];

/// Configuration for content extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Minimum score the winning candidate must reach.
    pub min_score_threshold: f64,
    /// Candidates shorter than a tenth of this many characters are skipped.
    pub char_threshold: usize,
    /// Upper bound on elements scanned; 0 means unlimited.
    pub max_elements: usize,
    /// Siblings scoring at least this fraction of the winner are kept.
    pub sibling_threshold: f64,
    pub scoring: ScoreConfig,
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 10.0,
            char_threshold: 250,
            max_elements: 1000,
            sibling_threshold: 0.2,
            scoring: ScoreConfig::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// Cleaned HTML of the detected article body.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub content: String,
    pub top_score: f64,
    /// Winner plus the siblings kept with it.
    pub element_count: usize,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    element: Element<'a>,
    /// Score from the element alone, which is what propagates upward.
    base: f64,
    /// Base score plus everything propagated from descendants.
    score: f64,
}

fn collect_candidates<'a>(doc: &'a Document, config: &ExtractConfig) -> Vec<Candidate<'a>> {
    let max_elements = if config.max_elements == 0 { usize::MAX } else { config.max_elements };
    let min_chars = config.char_threshold / 10;

    let mut candidates: Vec<Candidate<'a>> = Vec::new();
    let mut index = HashMap::new();
    let mut scanned = 0usize;

    'tags: for tag in CANDIDATE_TAGS {
        let Ok(elements) = doc.select(tag) else { continue };
        for element in elements {
            if scanned >= max_elements {
                break 'tags;
            }
            scanned += 1;

            let is_section = matches!(element.tag_name().as_str(), "article" | "section" | "main");
            if !is_section && element.text().trim().chars().count() < min_chars {
                continue;
            }

            let base = score_element(&element, &config.scoring).total;
            index.insert(element.node_key(), candidates.len());
            candidates.push(Candidate { element, base, score: base });
        }
    }

    let seeds: Vec<(Element<'a>, f64)> = candidates.iter().map(|c| (c.element.clone(), c.base)).collect();
    for (element, base) in seeds {
        let parent = element.parent();
        let grandparent = parent.as_ref().and_then(Element::parent);

        for (ancestor, divisor) in [(parent, 2.0), (grandparent, 3.0)] {
            let Some(ancestor) = ancestor else { continue };
            if matches!(ancestor.tag_name().as_str(), "html" | "head") {
                continue;
            }
            let slot = *index.entry(ancestor.node_key()).or_insert_with(|| {
                let own = score_element(&ancestor, &config.scoring).total;
                candidates.push(Candidate { element: ancestor.clone(), base: own, score: own });
                candidates.len() - 1
            });
            candidates[slot].score += base / divisor;
        }
    }

    candidates
}

/// Ties go to the more container-like tag, then to the longer text.
fn rank(a: &Candidate<'_>, b: &Candidate<'_>) -> std::cmp::Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| container_priority(&a.element.tag_name()).cmp(&container_priority(&b.element.tag_name())))
        .then_with(|| a.element.text().chars().count().cmp(&b.element.text().chars().count()))
}

fn container_priority(tag: &str) -> u8 {
    match tag {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}

fn select_top<'c, 'a>(candidates: &'c [Candidate<'a>], config: &ExtractConfig) -> Result<&'c Candidate<'a>> {
    let top = candidates.iter().max_by(|a, b| rank(a, b)).ok_or(ShelfmarkError::NoContent)?;

    if top.score < config.min_score_threshold {
        return Err(ShelfmarkError::NotReadable { score: top.score, threshold: config.min_score_threshold });
    }
    Ok(top)
}

/// The winner and the siblings worth keeping, in document order.
///
/// A sibling is kept when its own candidate score clears the sibling
/// threshold, or when it is a paragraph of more than 80 characters with a
/// link density under 0.25.
fn with_siblings<'a>(top: &Candidate<'a>, candidates: &[Candidate<'a>], config: &ExtractConfig) -> Vec<Element<'a>> {
    let Some(parent) = top.element.parent() else {
        return vec![top.element.clone()];
    };
    let threshold = top.score * config.sibling_threshold;
    let scores: HashMap<_, f64> = candidates.iter().map(|c| (c.element.node_key(), c.score)).collect();

    parent
        .children()
        .into_iter()
        .filter(|child| {
            if child.same_node(&top.element) {
                return true;
            }
            let scored = scores.get(&child.node_key()).is_some_and(|score| *score >= threshold);
            scored
                || (child.tag_name() == "p" && child.text().trim().chars().count() > 80 && link_density(child) < 0.25)
        })
        .collect()
}

/// Finds and cleans the main content of `doc`.
///
/// # Errors
///
/// [`ShelfmarkError::NoContent`] when there is no candidate at all and
/// [`ShelfmarkError::NotReadable`] when the best one scores too low.
pub fn extract_content(doc: &Document, config: &ExtractConfig) -> Result<ExtractedContent> {
    let candidates = collect_candidates(doc, config);
    let top = select_top(&candidates, config)?;
    let kept = with_siblings(top, &candidates, config);

    let joined = kept.iter().map(Element::outer_html).collect::<Vec<_>>().join("\n");
    let content = postprocess_html(&joined, &config.postprocess);

    tracing::debug!(top_score = top.score, tag = %top.element.tag_name(), kept = kept.len(), "selected content");

    Ok(ExtractedContent { content, top_score: top.score, element_count: kept.len() })
}
