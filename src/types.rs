// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::SourceType;

/// What kind of subject a lookup is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Individual,
    Group,
}

impl Category {
    /// Prefix used for cache keys, e.g. `MEMBER:jisoo`.
    pub fn key_prefix(self) -> &'static str {
        match self {
            Category::Individual => "MEMBER",
            Category::Group => "GROUP",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Individual => f.write_str("individual"),
            Category::Group => f.write_str("group"),
        }
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" | "member" | "idol" => Ok(Category::Individual),
            "group" | "band" => Ok(Category::Group),
            other => Err(anyhow::anyhow!("unknown category `{other}`")),
        }
    }
}

/// Where a fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Origin {
    Scraped { source_type: SourceType, primary: bool },
    Search,
    Database,
}

impl Origin {
    pub fn label(&self) -> &'static str {
        match self {
            Origin::Scraped { source_type, .. } => source_type.label(),
            Origin::Search => "search_api",
            Origin::Database => "database",
        }
    }

    /// Curated = a primary scraped source or the local dataset.
    pub fn is_curated(&self) -> bool {
        match self {
            Origin::Scraped { primary, .. } => *primary,
            Origin::Search => false,
            Origin::Database => true,
        }
    }
}

/// One extracted chunk of candidate text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub text: String,
    pub origin: Origin,
}

impl Fragment {
    pub fn new(text: impl Into<String>, origin: Origin) -> Self {
        Self {
            text: text.into(),
            origin,
        }
    }

    pub fn origin_source_type(&self) -> &'static str {
        self.origin.label()
    }
}
