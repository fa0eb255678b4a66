// src/extract/mod.rs
//! Content extraction: fetched document + source descriptor → text fragments.
//!
//! One strategy per [`SourceType`] variant (exhaustive match), each with its own
//! element cap, minimum length and boilerplate filters. Extraction never fails:
//! empty or malformed markup yields an empty list.

pub mod feed;
pub mod infobox;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::catalog::{SourceDescriptor, SourceType};
use crate::types::{Fragment, Origin};

/// Filter rules for free-text sources.
#[derive(Debug, Clone, Copy)]
pub struct TextRules {
    pub max_elements: usize,
    pub min_len: usize,
    pub deny_prefixes: &'static [&'static str],
    pub deny_contains: &'static [&'static str],
}

impl TextRules {
    pub fn for_type(source_type: SourceType) -> Self {
        match source_type {
            SourceType::Profile => Self {
                max_elements: 15,
                min_len: 30,
                deny_prefixes: &["Edit", "Share", "Related", "Tags:", "Please", "Do you", "Who is your"],
                deny_contains: &["cookie", "subscribe", "advertisement", "copyright"],
            },
            SourceType::Encyclopedia => Self {
                max_elements: 8,
                min_len: 50,
                deny_prefixes: &["Coordinates:", "Edit", "Jump to", "Main article", "See also", "This article", "For other uses"],
                deny_contains: &["may refer to", "disambiguation"],
            },
            SourceType::News => Self {
                max_elements: 10,
                min_len: 20,
                deny_prefixes: &["Advertisement", "Sign in", "Log in", "Read more", "Share", "Trending"],
                deny_contains: &["cookie", "newsletter"],
            },
            SourceType::Forum => Self {
                max_elements: 10,
                min_len: 40,
                deny_prefixes: &["[deleted]", "[removed]", "submitted", "Posted by", "level "],
                deny_contains: &["this post was removed"],
            },
            SourceType::Infobox => Self {
                max_elements: 25,
                min_len: 2,
                deny_prefixes: &[],
                deny_contains: &[],
            },
            SourceType::Feed => Self {
                max_elements: 10,
                min_len: 20,
                deny_prefixes: &[],
                deny_contains: &[],
            },
        }
    }

    pub fn accepts(&self, text: &str) -> bool {
        if text.chars().count() < self.min_len {
            return false;
        }
        if self.deny_prefixes.iter().any(|p| text.starts_with(p)) {
            return false;
        }
        let lower = text.to_lowercase();
        !self.deny_contains.iter().any(|d| lower.contains(d))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, document: &str, source: &SourceDescriptor) -> Vec<Fragment> {
        if document.trim().is_empty() {
            return Vec::new();
        }
        let origin = Origin::Scraped {
            source_type: source.source_type,
            primary: source.is_primary,
        };
        let rules = TextRules::for_type(source.source_type);

        let out = match source.source_type {
            SourceType::Feed => feed::extract_items(document, &rules, origin),
            SourceType::Infobox => match Selector::parse(&source.selector) {
                Ok(sel) => infobox::extract_fields(&Html::parse_document(document), &sel, &rules, origin),
                Err(_) => Vec::new(),
            },
            SourceType::Profile | SourceType::Encyclopedia | SourceType::News | SourceType::Forum => {
                match Selector::parse(&source.selector) {
                    Ok(sel) => extract_blocks(&Html::parse_document(document), &sel, &rules, origin),
                    Err(_) => Vec::new(),
                }
            }
        };

        debug!(source = %source.name, fragments = out.len(), "extracted");
        out
    }
}

/// Free-text blocks: each matched element's text, cleaned and filtered.
fn extract_blocks(html: &Html, sel: &Selector, rules: &TextRules, origin: Origin) -> Vec<Fragment> {
    html.select(sel)
        .take(rules.max_elements)
        .map(|el| clean_block(&el.text().collect::<String>()))
        .filter(|t| rules.accepts(t))
        .map(|t| Fragment::new(t, origin))
        .collect()
}

static RE_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:\d+|[a-z]|citation needed|note \d+)\]").expect("citation regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Drop wiki citation markers and collapse whitespace.
pub(crate) fn clean_block(s: &str) -> String {
    let out = RE_CITATION.replace_all(s, "");
    RE_WS.replace_all(&out, " ").trim().to_string()
}
