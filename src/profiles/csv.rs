// src/profiles/csv.rs
use anyhow::{anyhow, Context, Result};
use std::mem::take;
use std::path::Path;

use super::{ProfileRecord, ProfileStore};

/// In-memory dataset loaded once from a CSV export.
///
/// Expected header (case-insensitive, any order): `name`, `group`, `aliases`,
/// `birth_date`, `instagram`, `twitter`. Only `name` is mandatory.
/// `aliases` is `;`-separated.
#[derive(Debug, Clone, Default)]
pub struct CsvProfileStore {
    records: Vec<ProfileRecord>,
}

impl CsvProfileStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ProfileRecord>) -> Self {
        Self { records }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profiles from {}", path.display()))?;
        Self::from_csv_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut rows = parse_rows(text, ',').into_iter();
        let header = rows.next().ok_or_else(|| anyhow!("empty profiles csv"))?;
        let cols = Columns::from_header(&header)?;

        let records = rows
            .filter_map(|row| cols.record(&row))
            .collect::<Vec<_>>();
        tracing::info!(records = records.len(), "profiles csv loaded");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl ProfileStore for CsvProfileStore {
    async fn find_by_name(&self, name: &str) -> Result<Vec<ProfileRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.matches_name(name))
            .cloned()
            .collect())
    }

    async fn find_members(&self, group: &str) -> Result<Vec<ProfileRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.in_group(group))
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

struct Columns {
    name: usize,
    group: Option<usize>,
    aliases: Option<usize>,
    birth_date: Option<usize>,
    instagram: Option<usize>,
    twitter: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Result<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        Ok(Self {
            name: find(&["name", "stage_name"]).ok_or_else(|| anyhow!("missing `name` column"))?,
            group: find(&["group", "group_name"]),
            aliases: find(&["aliases", "alias"]),
            birth_date: find(&["birth_date", "birthday", "birthdate"]),
            instagram: find(&["instagram"]),
            twitter: find(&["twitter", "x"]),
        })
    }

    fn record(&self, row: &[String]) -> Option<ProfileRecord> {
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let name = cell(Some(self.name))?;
        let aliases = cell(self.aliases)
            .map(|a| {
                a.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(ProfileRecord {
            name,
            group: cell(self.group),
            aliases,
            birth_date: cell(self.birth_date),
            instagram: cell(self.instagram),
            twitter: cell(self.twitter),
        })
    }
}

/// Minimal CSV parser (quotes + CRLF tolerant).
fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // double-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == sep && !in_quotes => {
                row.push(take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Trailing row without a final newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}
