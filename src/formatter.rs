// src/formatter.rs
//! Turns a free-text subject (plus optional group hint) into a per-source URL.
//!
//! Order per source:
//! 1) alias substitution from the source family's table (required for some sources)
//! 2) slugging according to the source type's convention
//! 3) `{slug}` / `{group}` template fill
//!
//! `None` means "skip this source": a policy outcome, not an error.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::aliases::AliasTable;
use crate::catalog::{SlugStyle, SourceDescriptor};
use crate::profiles::ProfileStore;
use crate::types::Category;

/// Tie-breaker for stage names shared across groups (earlier wins).
pub const DEFAULT_GROUP_PRIORITY: &[&str] = &[
    "BTS",
    "BLACKPINK",
    "TWICE",
    "EXO",
    "Red Velvet",
    "SEVENTEEN",
    "Stray Kids",
    "NewJeans",
    "aespa",
    "IVE",
    "ITZY",
    "(G)I-DLE",
    "LE SSERAFIM",
    "NCT 127",
    "NCT Dream",
    "ENHYPEN",
    "TXT",
    "ATEEZ",
];

pub struct QueryFormatter {
    aliases: Arc<AliasTable>,
    profiles: Arc<dyn ProfileStore>,
    group_priority: Vec<String>,
}

impl QueryFormatter {
    pub fn new(aliases: Arc<AliasTable>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            aliases,
            profiles,
            group_priority: DEFAULT_GROUP_PRIORITY.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the tie-breaking list (empty keeps the built-in one).
    pub fn with_group_priority(mut self, groups: Vec<String>) -> Self {
        if !groups.is_empty() {
            self.group_priority = groups;
        }
        self
    }

    /// Resolve which group an individual subject belongs to.
    ///
    /// - Group subjects never get a group hint.
    /// - A hint that matches a dataset row `(name, group)` resolves to that row's spelling.
    /// - A hint with no matching row is trusted as given.
    /// - Without a hint, the dataset rows for the name are ranked by the group priority
    ///   list, then alphabetically, so the same input always resolves the same way.
    pub async fn resolve_group(
        &self,
        subject: &str,
        hint: Option<&str>,
        category: Category,
    ) -> Option<String> {
        if category == Category::Group {
            return None;
        }
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());

        let rows = match self.profiles.find_by_name(subject).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = ?e, store = self.profiles.name(), "profile lookup failed during disambiguation");
                Vec::new()
            }
        };

        if let Some(h) = hint {
            return Some(
                rows.iter()
                    .find(|r| r.in_group(h))
                    .and_then(|r| r.group.clone())
                    .unwrap_or_else(|| h.to_string()),
            );
        }

        let mut groups = rows.into_iter().filter_map(|r| r.group).collect::<Vec<_>>();
        groups.sort_by_key(|g| (self.priority_rank(g), g.to_lowercase()));
        let picked = groups.into_iter().next();
        if let Some(g) = &picked {
            debug!(group = %g, "group resolved from dataset");
        }
        picked
    }

    fn priority_rank(&self, group: &str) -> usize {
        self.group_priority
            .iter()
            .position(|p| p.eq_ignore_ascii_case(group.trim()))
            .unwrap_or(usize::MAX)
    }

    /// Build the URL for `source`, or `None` when the source must be skipped.
    pub fn format(
        &self,
        subject: &str,
        hint: Option<&str>,
        source: &SourceDescriptor,
    ) -> Option<String> {
        let subject = subject.trim();
        if subject.is_empty() {
            return None;
        }
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());

        let key = match source.alias_family {
            Some(family) => match self.aliases.lookup(family, subject) {
                Some(alias) => alias.to_string(),
                None if source.alias_required => {
                    debug!(source = %source.name, "no alias for subject; skipping source");
                    return None;
                }
                None => subject.to_string(),
            },
            None => subject.to_string(),
        };

        let style = source.source_type.slug_style();

        let group_slug = if source.needs_group() {
            let group = hint?;
            let aliased = source
                .alias_family
                .and_then(|f| self.aliases.lookup(f, group))
                .unwrap_or(group);
            Some(slugify(aliased, style))
        } else {
            None
        };

        let slug = match (style, hint) {
            // Search-style sources get the group folded into the query text.
            (SlugStyle::QueryEncoded, Some(h)) if !source.needs_group() => {
                slugify(&format!("{key} {h}"), style)
            }
            _ => slugify(&key, style),
        };
        if slug.is_empty() {
            return None;
        }

        let mut url = source.url_template.replace("{slug}", &slug);
        if let Some(g) = group_slug {
            url = url.replace("{group}", &g);
        }
        Some(url)
    }
}

/// ASCII that would end or split a wiki path segment. Parentheses, apostrophes
/// and non-ASCII letters stay literal, the way wiki titles are linked.
fn is_path_reserved(ch: char) -> bool {
    matches!(
        ch,
        '?' | '#' | '&' | '/' | '%' | '+' | '"' | '<' | '>' | '[' | ']' | '{' | '}' | '|' | '\\' | '^' | '`' | '='
    )
}

/// Convert a name to a URL segment in the given style.
pub fn slugify(name: &str, style: SlugStyle) -> String {
    let words = name.split_whitespace().collect::<Vec<_>>();
    match style {
        SlugStyle::LowerHyphen => {
            let mut out = String::with_capacity(name.len());
            for ch in name.trim().to_lowercase().chars() {
                if ch.is_alphanumeric() {
                    out.push(ch);
                } else if !out.ends_with('-') && !out.is_empty() {
                    out.push('-');
                }
            }
            out.trim_end_matches('-').to_string()
        }
        SlugStyle::TitleUnderscore => words
            .iter()
            .map(|w| {
                let mut cs = w.chars();
                match cs.next() {
                    Some(first) => first.to_uppercase().chain(cs).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join("_")
            .chars()
            .fold(String::with_capacity(name.len()), |mut out, ch| {
                if is_path_reserved(ch) {
                    out.push_str(&format!("%{:02X}", ch as u32));
                } else {
                    out.push(ch);
                }
                out
            }),
        SlugStyle::QueryEncoded => urlencoding::encode(&words.join(" ")).into_owned(),
    }
}
