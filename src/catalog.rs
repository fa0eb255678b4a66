//! # Source Catalog
//!
//! Static, ordered list of scrape targets. Each [`SourceDescriptor`] carries a URL
//! template, a CSS selector, a priority weight in `[0.0, 1.0]`, a per-request
//! timeout and a "primary/trusted" flag.
//!
//! - Sorted by priority (descending) at construction.
//! - `tiers()` partitions descriptors into priority bands for staged fetching.
//! - Read-only after construction: the catalog is configuration, not state.
//! - `default_seed()` holds the built-in source list used when the config has none.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::aliases::AliasFamily;
use crate::types::Category;

/// Priority floor of the high tier.
pub const HIGH_TIER_MIN: f32 = 0.8;
/// Priority floor of the medium tier.
pub const MEDIUM_TIER_MIN: f32 = 0.6;

/// Closed set of source kinds; every variant has its own slug style and extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Long-form fan profile articles (one fact per paragraph).
    Profile,
    /// Label/value info-boxes (wiki side tables).
    Infobox,
    /// Encyclopedia body paragraphs.
    Encyclopedia,
    /// News site search result pages.
    News,
    /// Forum / community search result pages.
    Forum,
    /// RSS news feeds.
    Feed,
}

/// How a subject is turned into a URL segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugStyle {
    /// `stray-kids`
    LowerHyphen,
    /// `Stray_Kids`
    TitleUnderscore,
    /// `Stray%20Kids` (search query parameter)
    QueryEncoded,
}

impl SourceType {
    pub fn label(self) -> &'static str {
        match self {
            SourceType::Profile => "profile",
            SourceType::Infobox => "infobox",
            SourceType::Encyclopedia => "encyclopedia",
            SourceType::News => "news",
            SourceType::Forum => "forum",
            SourceType::Feed => "feed",
        }
    }

    pub fn slug_style(self) -> SlugStyle {
        match self {
            SourceType::Profile => SlugStyle::LowerHyphen,
            SourceType::Infobox | SourceType::Encyclopedia => SlugStyle::TitleUnderscore,
            SourceType::News | SourceType::Forum | SourceType::Feed => SlugStyle::QueryEncoded,
        }
    }
}

/// Priority band of sources fetched together before re-checking sufficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    pub fn for_priority(priority: f32) -> Self {
        if priority >= HIGH_TIER_MIN {
            Tier::High
        } else if priority >= MEDIUM_TIER_MIN {
            Tier::Medium
        } else {
            Tier::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

/// One scrape target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    /// URL with `{slug}` and optionally `{group}` placeholders.
    pub url_template: String,
    pub selector: String,
    pub source_type: SourceType,
    pub priority: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub is_primary: bool,
    /// `None` = applies to both categories.
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub alias_family: Option<AliasFamily>,
    /// Skip this source when the subject has no alias in `alias_family`.
    #[serde(default)]
    pub alias_required: bool,
}

impl SourceDescriptor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    pub fn tier(&self) -> Tier {
        Tier::for_priority(self.priority)
    }

    pub fn applies_to(&self, category: Category) -> bool {
        self.category.map_or(true, |c| c == category)
    }

    pub fn needs_group(&self) -> bool {
        self.url_template.contains("{group}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("source `{name}` has priority {priority} outside [0, 1]")]
    PriorityOutOfRange { name: String, priority: f32 },
    #[error("source `{name}` has no `{{slug}}` placeholder in its url template")]
    MissingSlug { name: String },
    #[error("source `{name}` has an invalid selector `{selector}`")]
    InvalidSelector { name: String, selector: String },
    #[error("source `{name}` requires an alias but names no alias family")]
    AliasFamilyMissing { name: String },
}

/// Ordered, filterable, immutable view of the configured sources.
#[derive(Debug, Clone)]
pub struct SourceCatalog {
    sources: Vec<SourceDescriptor>,
}

impl SourceCatalog {
    /// Validate and sort (priority descending, stable for equal priorities).
    pub fn new(mut sources: Vec<SourceDescriptor>) -> Result<Self, CatalogError> {
        for s in &sources {
            if !(0.0..=1.0).contains(&s.priority) {
                return Err(CatalogError::PriorityOutOfRange {
                    name: s.name.clone(),
                    priority: s.priority,
                });
            }
            if !s.url_template.contains("{slug}") {
                return Err(CatalogError::MissingSlug {
                    name: s.name.clone(),
                });
            }
            // Feeds are parsed as XML; their selector names the item element.
            if s.source_type != SourceType::Feed && Selector::parse(&s.selector).is_err() {
                return Err(CatalogError::InvalidSelector {
                    name: s.name.clone(),
                    selector: s.selector.clone(),
                });
            }
            if s.alias_required && s.alias_family.is_none() {
                return Err(CatalogError::AliasFamilyMissing {
                    name: s.name.clone(),
                });
            }
        }
        sources.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        Ok(Self { sources })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources, priority descending.
    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Sources applicable to `category`, priority descending.
    pub fn for_category(&self, category: Category) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter().filter(move |s| s.applies_to(category))
    }

    /// Sources partitioned into the three priority bands (always three entries, possibly empty).
    pub fn tiers(&self, category: Category) -> Vec<(Tier, Vec<&SourceDescriptor>)> {
        Tier::ALL
            .iter()
            .map(|&tier| {
                let members = self
                    .for_category(category)
                    .filter(|s| s.tier() == tier)
                    .collect::<Vec<_>>();
                (tier, members)
            })
            .collect()
    }

    /// Built-in catalog used when no `[[sources]]` are configured.
    pub fn default_seed() -> Self {
        Self::new(default_sources()).unwrap_or_else(|e| {
            tracing::error!(error = %e, "built-in source seed is invalid");
            Self {
                sources: Vec::new(),
            }
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn src(
    name: &str,
    url_template: &str,
    selector: &str,
    source_type: SourceType,
    priority: f32,
    timeout_seconds: u64,
    is_primary: bool,
    category: Option<Category>,
    alias: Option<(AliasFamily, bool)>,
) -> SourceDescriptor {
    SourceDescriptor {
        name: name.to_string(),
        url_template: url_template.to_string(),
        selector: selector.to_string(),
        source_type,
        priority,
        timeout_seconds,
        is_primary,
        category,
        alias_family: alias.map(|(f, _)| f),
        alias_required: alias.is_some_and(|(_, required)| required),
    }
}

fn default_sources() -> Vec<SourceDescriptor> {
    use AliasFamily as F;
    use Category::{Group, Individual};
    use SourceType as T;

    vec![
        src(
            "kprofiles-member",
            "https://kprofiles.com/{slug}-profile-facts/",
            ".entry-content p",
            T::Profile,
            0.95,
            10,
            true,
            Some(Individual),
            Some((F::Kprofiles, false)),
        ),
        src(
            "kprofiles-group",
            "https://kprofiles.com/{slug}-members-profile/",
            ".entry-content p",
            T::Profile,
            0.95,
            10,
            true,
            Some(Group),
            Some((F::Kprofiles, false)),
        ),
        src(
            "wikipedia-infobox",
            "https://en.wikipedia.org/wiki/{slug}",
            "table.infobox tr",
            T::Infobox,
            0.9,
            8,
            true,
            None,
            Some((F::Wikipedia, false)),
        ),
        src(
            "wikipedia-summary",
            "https://en.wikipedia.org/wiki/{slug}",
            "div.mw-parser-output > p",
            T::Encyclopedia,
            0.85,
            8,
            true,
            None,
            Some((F::Wikipedia, false)),
        ),
        src(
            "fandom-member",
            "https://kpop.fandom.com/wiki/{slug}_({group})",
            "aside.portable-infobox .pi-data",
            T::Infobox,
            0.75,
            8,
            false,
            Some(Individual),
            Some((F::Fandom, false)),
        ),
        src(
            "fandom-group",
            "https://kpop.fandom.com/wiki/{slug}",
            "div.mw-parser-output > p",
            T::Encyclopedia,
            0.7,
            8,
            false,
            Some(Group),
            Some((F::Fandom, false)),
        ),
        src(
            "dbkpop-group",
            "https://dbkpop.com/group/{slug}/",
            ".entry-content p",
            T::Profile,
            0.65,
            8,
            false,
            Some(Group),
            Some((F::Dbkpop, true)),
        ),
        src(
            "soompi-search",
            "https://www.soompi.com/search?query={slug}",
            "article h2, article p",
            T::News,
            0.55,
            6,
            false,
            None,
            None,
        ),
        src(
            "reddit-kpop-search",
            "https://old.reddit.com/r/kpop/search?q={slug}&restrict_sr=on",
            "a.search-title, div.search-result-body",
            T::Forum,
            0.45,
            6,
            false,
            None,
            None,
        ),
        src(
            "google-news-feed",
            "https://news.google.com/rss/search?q={slug}&hl=en-US&gl=US&ceid=US:en",
            "item",
            T::Feed,
            0.4,
            6,
            false,
            None,
            None,
        ),
    ]
}
