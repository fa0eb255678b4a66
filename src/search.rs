// src/search.rs
//! Search-API supplement (Google Custom Search JSON API).
//!
//! A fixed set of `(key, cx)` credentials is rotated round-robin. Each query
//! starts from the last credential that worked; quota and auth rejections
//! (429/401/403) move on to the next one. When every credential has been
//! rejected the call reports `Exhausted` and the caller carries on without it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::clean_block;
use crate::fetch::SharedClient;
use crate::types::{Category, Fragment, Origin};

pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";
pub const DEFAULT_RESULTS_PER_QUERY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCredential {
    pub key: String,
    pub cx: String,
}

/// Parse `key:cx,key:cx`. Malformed pairs are dropped.
pub fn parse_credentials(raw: &str) -> Vec<SearchCredential> {
    raw.split(',')
        .filter_map(|pair| {
            let (key, cx) = pair.trim().split_once(':')?;
            let (key, cx) = (key.trim(), cx.trim());
            (!key.is_empty() && !cx.is_empty()).then(|| SearchCredential {
                key: key.to_string(),
                cx: cx.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no search credentials configured")]
    NoCredentials,
    #[error("all {0} search credentials rejected")]
    Exhausted(usize),
    #[error("search request failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait SearchSupplement: Send + Sync {
    async fn search(
        &self,
        subject: &str,
        hint: Option<&str>,
        category: Category,
    ) -> Result<Vec<Fragment>, SearchError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: Option<String>,
    snippet: Option<String>,
}

pub struct GoogleSearch {
    client: SharedClient,
    endpoint: String,
    credentials: Vec<SearchCredential>,
    cursor: AtomicUsize,
    timeout: Duration,
    results_per_query: u8,
}

impl GoogleSearch {
    pub fn new(client: SharedClient, credentials: Vec<SearchCredential>) -> Self {
        Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials,
            cursor: AtomicUsize::new(0),
            timeout: Duration::from_secs(10),
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_results_per_query(mut self, n: u8) -> Self {
        self.results_per_query = n.clamp(1, 10);
        self
    }

    /// Index of the credential the next query starts from.
    pub fn current_credential(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }

    async fn run_query(&self, query: &str) -> Result<Vec<Fragment>, SearchError> {
        let n = self.credentials.len();
        if n == 0 {
            return Err(SearchError::NoCredentials);
        }
        let client = self
            .client
            .get()
            .map_err(|e| SearchError::Request(e.to_string()))?;
        let start = self.cursor.load(Ordering::Relaxed) % n;
        let num = self.results_per_query.to_string();

        for step in 0..n {
            let idx = (start + step) % n;
            let cred = &self.credentials[idx];
            let resp = client
                .get(&self.endpoint)
                .timeout(self.timeout)
                .query(&[
                    ("key", cred.key.as_str()),
                    ("cx", cred.cx.as_str()),
                    ("q", query),
                    ("num", num.as_str()),
                ])
                .send()
                .await
                .map_err(|e| SearchError::Request(e.to_string()))?;

            let status = resp.status().as_u16();
            if matches!(status, 429 | 401 | 403) {
                warn!(credential = idx, status, "search credential rejected; rotating");
                metrics::counter!("lookup_search_rotations_total").increment(1);
                continue;
            }
            if !resp.status().is_success() {
                return Err(SearchError::Request(format!("HTTP {status}")));
            }

            self.cursor.store(idx, Ordering::Relaxed);
            let body: SearchResponse = resp
                .json()
                .await
                .map_err(|e| SearchError::Request(e.to_string()))?;
            return Ok(body.items.into_iter().filter_map(item_fragment).collect());
        }

        Err(SearchError::Exhausted(n))
    }
}

fn item_fragment(item: SearchItem) -> Option<Fragment> {
    let title = item.title.map(|t| clean_block(&t)).unwrap_or_default();
    let snippet = item.snippet.map(|s| clean_block(&s)).unwrap_or_default();
    let text = match (title.is_empty(), snippet.is_empty()) {
        (true, true) => return None,
        (false, true) => title,
        (true, false) => snippet,
        (false, false) => format!("{}. {}", title.trim_end_matches('.'), snippet),
    };
    Some(Fragment::new(text, Origin::Search))
}

/// The two queries issued per subject.
pub fn queries_for(subject: &str, hint: Option<&str>, category: Category) -> [String; 2] {
    let subject = subject.trim();
    match (category, hint.map(str::trim).filter(|h| !h.is_empty())) {
        (Category::Individual, Some(g)) => [
            format!("{subject} {g} kpop profile"),
            format!("{subject} {g} birthday instagram"),
        ],
        (Category::Individual, None) => [
            format!("{subject} kpop idol profile"),
            format!("{subject} kpop birthday instagram"),
        ],
        (Category::Group, _) => [
            format!("{subject} kpop group members profile"),
            format!("{subject} kpop debut agency"),
        ],
    }
}

#[async_trait]
impl SearchSupplement for GoogleSearch {
    async fn search(
        &self,
        subject: &str,
        hint: Option<&str>,
        category: Category,
    ) -> Result<Vec<Fragment>, SearchError> {
        let mut out = Vec::new();
        for q in queries_for(subject, hint, category) {
            match self.run_query(&q).await {
                Ok(frags) => {
                    debug!(results = frags.len(), "search query done");
                    out.extend(frags);
                }
                // Keep what the first query returned if the second one fails.
                Err(e) if !out.is_empty() => {
                    warn!(error = %e, "search query failed; keeping partial results");
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "google_cse"
    }
}
