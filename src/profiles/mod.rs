// src/profiles/mod.rs
//! Local structured dataset of idols: one record per (name, group) pair.
//!
//! The dataset is owned by a separate ingestion process; this crate only reads it.
//! Missing columns are resolved to `None` at the loading boundary.

pub mod csv;
#[cfg(feature = "postgres")]
pub mod postgres;

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub name: String,
    pub group: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub birth_date: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
}

impl ProfileRecord {
    /// Exact, case-insensitive match on the name or any alias.
    pub fn matches_name(&self, subject: &str) -> bool {
        let s = subject.trim().to_lowercase();
        self.name.trim().to_lowercase() == s
            || self.aliases.iter().any(|a| a.trim().to_lowercase() == s)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.group
            .as_deref()
            .is_some_and(|g| g.trim().to_lowercase() == group.trim().to_lowercase())
    }

    /// Plain-text rendering used as the database fragment.
    pub fn to_fragment_text(&self) -> String {
        let mut parts = vec![format!("Name: {}.", self.name)];
        if let Some(g) = &self.group {
            parts.push(format!("Group: {g}."));
        }
        if !self.aliases.is_empty() {
            parts.push(format!("Also known as: {}.", self.aliases.join(", ")));
        }
        if let Some(b) = &self.birth_date {
            parts.push(format!("Birth date: {b}."));
        }
        if let Some(ig) = &self.instagram {
            parts.push(format!("Instagram: {ig}"));
        }
        if let Some(tw) = &self.twitter {
            parts.push(format!("Twitter: {tw}"));
        }
        parts.join(" ")
    }
}

/// Text for a group-category subject: roster of known members.
pub fn roster_text(group: &str, members: &[ProfileRecord]) -> String {
    let names = members
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Group: {group}. Members: {names}.")
}

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// All records whose name (or alias) equals `name`, case-insensitively, in dataset order.
    async fn find_by_name(&self, name: &str) -> Result<Vec<ProfileRecord>>;

    /// All records whose group equals `group`, case-insensitively, in dataset order.
    async fn find_members(&self, group: &str) -> Result<Vec<ProfileRecord>>;

    fn name(&self) -> &'static str;
}
