// src/orchestrator.rs
//! Tiered aggregation.
//!
//! ```text
//! Pending → TierHigh → TierMedium → TierLow → SupplementSearch → SupplementDatabase → Done
//! ```
//! Tiers run strictly in sequence; the gate is consulted after each one and a
//! passing verdict jumps straight to `Done`. Inside a tier every formatted URL is
//! fetched concurrently under a shared semaphore, each fetch bounded by its
//! source's timeout. Per-source failures are logged and dropped. The worst case
//! is an empty result, never an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::cache::Provenance;
use crate::catalog::{SourceCatalog, SourceDescriptor, Tier};
use crate::extract::ContentExtractor;
use crate::fetch::{FetchError, PageFetcher};
use crate::formatter::QueryFormatter;
use crate::gate::SufficiencyGate;
use crate::logging::subject_id;
use crate::normalize::normalize;
use crate::profiles::{roster_text, ProfileStore};
use crate::search::SearchSupplement;
use crate::types::{Category, Fragment, Origin};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    TierHigh,
    TierMedium,
    TierLow,
    SupplementSearch,
    SupplementDatabase,
    Done,
}

impl Stage {
    fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::High => Stage::TierHigh,
            Tier::Medium => Stage::TierMedium,
            Tier::Low => Stage::TierLow,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationResult {
    pub raw_fragments: Vec<Fragment>,
    pub normalized_text: String,
    pub stages: Vec<Stage>,
    pub resolved_group: Option<String>,
}

impl AggregationResult {
    pub fn provenance(&self) -> Provenance {
        Provenance::of(&self.raw_fragments)
    }

    /// Empty text means "not found".
    pub fn is_empty(&self) -> bool {
        self.normalized_text.is_empty()
    }

    pub fn visited(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }
}

pub struct FetchOrchestrator {
    catalog: Arc<SourceCatalog>,
    formatter: Arc<QueryFormatter>,
    extractor: ContentExtractor,
    fetcher: Arc<dyn PageFetcher>,
    profiles: Arc<dyn ProfileStore>,
    search: Option<Arc<dyn SearchSupplement>>,
    gate: SufficiencyGate,
    limiter: Arc<Semaphore>,
}

impl FetchOrchestrator {
    pub fn new(
        catalog: Arc<SourceCatalog>,
        formatter: Arc<QueryFormatter>,
        fetcher: Arc<dyn PageFetcher>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            catalog,
            formatter,
            extractor: ContentExtractor::new(),
            fetcher,
            profiles,
            search: None,
            gate: SufficiencyGate::default(),
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_FETCHES)),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchSupplement>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_gate(mut self, gate: SufficiencyGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_concurrency(mut self, max: usize) -> Self {
        self.limiter = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub async fn aggregate(
        &self,
        subject: &str,
        hint: Option<&str>,
        category: Category,
    ) -> AggregationResult {
        let started = Instant::now();
        let sid = subject_id(subject);
        let mut stages = vec![Stage::Pending];
        let mut fragments: Vec<Fragment> = Vec::new();

        if subject.trim().is_empty() {
            stages.push(Stage::Done);
            return AggregationResult {
                raw_fragments: fragments,
                normalized_text: String::new(),
                stages,
                resolved_group: None,
            };
        }

        let group = self.formatter.resolve_group(subject, hint, category).await;
        let mut sufficient = false;

        for (tier, sources) in self.catalog.tiers(category) {
            stages.push(Stage::for_tier(tier));
            let got = self.run_tier(subject, group.as_deref(), &sources).await;
            debug!(subject_id = %sid, tier = tier.label(), fragments = got.len(), "tier finished");
            fragments.extend(got);

            let verdict = self.gate.evaluate(&fragments);
            if verdict.sufficient {
                info!(
                    subject_id = %sid,
                    tier = tier.label(),
                    chars = verdict.total_chars,
                    hits = verdict.keyword_hits,
                    relaxed = verdict.relaxed,
                    "sufficient; stopping"
                );
                metrics::counter!("lookup_tier_stop_total", "tier" => tier.label()).increment(1);
                sufficient = true;
                break;
            }
        }

        if !sufficient {
            if let Some(search) = &self.search {
                stages.push(Stage::SupplementSearch);
                match search.search(subject, group.as_deref(), category).await {
                    Ok(found) => {
                        debug!(subject_id = %sid, fragments = found.len(), "search supplement");
                        fragments.extend(found);
                    }
                    Err(e) => warn!(subject_id = %sid, error = %e, provider = search.name(), "search supplement failed"),
                }
            }

            stages.push(Stage::SupplementDatabase);
            if let Some(record) = self.database_fragment(subject, group.as_deref(), category).await {
                fragments.push(record);
            }
        }

        let normalized_text = normalize(&fragments);
        stages.push(Stage::Done);

        let elapsed = started.elapsed();
        metrics::histogram!("lookup_aggregate_ms").record(elapsed.as_secs_f64() * 1000.0);
        info!(
            subject_id = %sid,
            category = %category,
            fragments = fragments.len(),
            chars = normalized_text.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "aggregation done"
        );

        AggregationResult {
            raw_fragments: fragments,
            normalized_text,
            stages,
            resolved_group: group,
        }
    }

    /// Fetch and extract every source in one tier. Sources sharing a URL are fetched once;
    /// output follows catalog order regardless of completion order.
    async fn run_tier(
        &self,
        subject: &str,
        group: Option<&str>,
        sources: &[&SourceDescriptor],
    ) -> Vec<Fragment> {
        let planned = sources
            .iter()
            .filter_map(|s| match self.formatter.format(subject, group, s) {
                Some(url) => Some((*s, url)),
                None => {
                    debug!(source = %s.name, "source skipped by formatter");
                    None
                }
            })
            .collect::<Vec<_>>();

        let mut unique: Vec<(&str, Duration)> = Vec::new();
        for (s, url) in &planned {
            if !unique.iter().any(|(u, _)| *u == url.as_str()) {
                unique.push((url.as_str(), s.timeout()));
            }
        }

        let bodies = join_all(unique.iter().map(|(url, t)| self.fetch_one(url, *t))).await;
        let by_url: HashMap<&str, Result<String, FetchError>> = unique
            .iter()
            .map(|(u, _)| *u)
            .zip(bodies)
            .collect();

        let mut out = Vec::new();
        for (source, url) in &planned {
            match by_url.get(url.as_str()) {
                Some(Ok(doc)) => out.extend(self.extractor.extract(doc, source)),
                Some(Err(e)) => {
                    warn!(source = %source.name, url = %url, error = %e, "source failed");
                    metrics::counter!("lookup_source_errors_total", "source" => source.name.clone())
                        .increment(1);
                }
                None => {}
            }
        }
        out
    }

    async fn fetch_one(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| FetchError::Client(e.to_string()))?;
        match tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    /// Local dataset record (individual) or member roster (group).
    async fn database_fragment(
        &self,
        subject: &str,
        group: Option<&str>,
        category: Category,
    ) -> Option<Fragment> {
        let text = match category {
            Category::Individual => {
                let rows = self
                    .profiles
                    .find_by_name(subject)
                    .await
                    .map_err(|e| warn!(error = ?e, store = self.profiles.name(), "profile lookup failed"))
                    .ok()?;
                let picked = group
                    .and_then(|g| rows.iter().find(|r| r.in_group(g)))
                    .or_else(|| rows.first())?;
                picked.to_fragment_text()
            }
            Category::Group => {
                let members = self
                    .profiles
                    .find_members(subject)
                    .await
                    .map_err(|e| warn!(error = ?e, store = self.profiles.name(), "member lookup failed"))
                    .ok()?;
                let first = members.first()?;
                let name = first.group.as_deref().unwrap_or(subject.trim());
                roster_text(name, &members)
            }
        };
        Some(Fragment::new(text, Origin::Database))
    }
}
