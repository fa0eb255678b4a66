// src/gate.rs
//! Sufficiency gate: decides whether the fragments gathered so far are enough
//! to stop querying further sources.
//!
//! Verdict = length floor AND distinct domain-keyword hits. When the high-value
//! markers (explicit birthday, social handle) are all present the length floor
//! drops to `relaxed_min_chars`. Pure and deterministic.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Fragment;

pub const DEFAULT_MIN_CHARS: usize = 1500;
pub const DEFAULT_MIN_KEYWORD_HITS: usize = 3;
pub const DEFAULT_RELAXED_MIN_CHARS: usize = 500;

pub const ENV_GATE_MIN_CHARS: &str = "LOOKUP_GATE_MIN_CHARS";
pub const ENV_GATE_MIN_HITS: &str = "LOOKUP_GATE_MIN_HITS";

fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}
fn default_min_keyword_hits() -> usize {
    DEFAULT_MIN_KEYWORD_HITS
}
fn default_relaxed_min_chars() -> usize {
    DEFAULT_RELAXED_MIN_CHARS
}
fn default_keywords() -> Vec<String> {
    [
        "profile",
        "member",
        "group",
        "debut",
        "agency",
        "birthday",
        "position",
        "instagram",
        "entertainment",
        "album",
        "fandom",
        "height",
        "zodiac",
        "nationality",
        "trainee",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_min_keyword_hits")]
    pub min_keyword_hits: usize,
    #[serde(default = "default_relaxed_min_chars")]
    pub relaxed_min_chars: usize,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            min_keyword_hits: DEFAULT_MIN_KEYWORD_HITS,
            relaxed_min_chars: DEFAULT_RELAXED_MIN_CHARS,
            keywords: default_keywords(),
        }
    }
}

impl GateConfig {
    /// Apply `LOOKUP_GATE_MIN_CHARS` / `LOOKUP_GATE_MIN_HITS`; unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_usize_env(std::env::var(ENV_GATE_MIN_CHARS).ok()) {
            self.min_chars = v;
        }
        if let Some(v) = parse_usize_env(std::env::var(ENV_GATE_MIN_HITS).ok()) {
            self.min_keyword_hits = v;
        }
        // Relaxed floor never exceeds the normal one.
        self.relaxed_min_chars = self.relaxed_min_chars.min(self.min_chars);
    }
}

fn parse_usize_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}

/// High-value markers: their presence means "found what matters even if brief".
static MARKERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "birthday",
            Regex::new(r"(?i)\b(?:birth\s?date|birthday|born)\b[^.\n]{0,40}?\d").expect("birthday regex"),
        ),
        (
            "handle",
            Regex::new(r"(?i)(?:\b(?:instagram|twitter|tiktok)\b\s*:?\s*@?[a-z0-9_.]{3,}|(?:^|\s)@[a-z0-9_.]{3,})")
                .expect("handle regex"),
        ),
    ]
});

#[derive(Debug, Clone, PartialEq)]
pub struct GateVerdict {
    pub sufficient: bool,
    pub total_chars: usize,
    pub keyword_hits: usize,
    pub markers: Vec<&'static str>,
    pub relaxed: bool,
}

#[derive(Debug, Clone)]
pub struct SufficiencyGate {
    cfg: GateConfig,
    keywords: Vec<String>,
}

impl Default for SufficiencyGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl SufficiencyGate {
    pub fn new(cfg: GateConfig) -> Self {
        let mut keywords = cfg
            .keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>();
        keywords.sort();
        keywords.dedup();
        Self { cfg, keywords }
    }

    pub fn config(&self) -> &GateConfig {
        &self.cfg
    }

    pub fn is_sufficient(&self, fragments: &[Fragment]) -> bool {
        self.evaluate(fragments).sufficient
    }

    pub fn evaluate(&self, fragments: &[Fragment]) -> GateVerdict {
        let joined = concat(fragments);
        let total_chars = joined.chars().count();
        let lower = joined.to_lowercase();

        let keyword_hits = self.keywords.iter().filter(|k| lower.contains(k.as_str())).count();

        let markers = MARKERS
            .iter()
            .filter(|(_, re)| re.is_match(&joined))
            .map(|(name, _)| *name)
            .collect::<Vec<_>>();
        let relaxed = markers.len() == MARKERS.len();

        let floor = if relaxed {
            self.cfg.relaxed_min_chars.min(self.cfg.min_chars)
        } else {
            self.cfg.min_chars
        };
        let sufficient = total_chars >= floor && keyword_hits >= self.cfg.min_keyword_hits;

        GateVerdict {
            sufficient,
            total_chars,
            keyword_hits,
            markers,
            relaxed,
        }
    }
}

/// Fragment texts, trimmed, blanks dropped, joined with single spaces.
pub fn concat(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
