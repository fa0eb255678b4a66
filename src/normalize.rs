// src/normalize.rs
//! Text normalizer: aggregated fragments → one clean blob for the summarizer.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::Fragment;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z][^>]*>").expect("tag regex"));
static RE_URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Join fragment texts (exact duplicates dropped) and clean the result.
pub fn normalize(fragments: &[Fragment]) -> String {
    let mut seen = HashSet::new();
    let joined = fragments
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&joined)
}

/// Decode entities, strip tags and URLs, ASCII-fy quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let out = RE_TAGS.replace_all(&decoded, " ");
    let out = RE_URLS.replace_all(&out, " ");
    let out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace('\u{00A0}', " ");
    RE_WS.replace_all(&out, " ").trim().to_string()
}
