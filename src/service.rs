// src/service.rs
//! Cache-in-front-of-orchestrator entry point used by the HTTP surface and the demo binary.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::cache::{Provenance, ResultCache};
use crate::logging::subject_id;
use crate::orchestrator::{FetchOrchestrator, Stage};
use crate::types::Category;

#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub text: String,
    pub cache_hit: bool,
    /// Unknown on a cache hit.
    pub provenance: Option<Provenance>,
    pub stages: Vec<Stage>,
}

impl LookupOutcome {
    pub fn found(&self) -> bool {
        !self.text.is_empty()
    }
}

#[derive(Clone)]
pub struct LookupService {
    orchestrator: Arc<FetchOrchestrator>,
    cache: ResultCache,
}

impl LookupService {
    pub fn new(orchestrator: Arc<FetchOrchestrator>, cache: ResultCache) -> Self {
        Self { orchestrator, cache }
    }

    pub async fn lookup(&self, subject: &str, hint: Option<&str>, category: Category) -> LookupOutcome {
        let key = ResultCache::key(category, subject, hint);
        if let Some(text) = self.cache.get(&key).await {
            debug!(subject_id = %subject_id(subject), "cache hit");
            return LookupOutcome {
                text,
                cache_hit: true,
                provenance: None,
                stages: Vec::new(),
            };
        }

        let result = self.orchestrator.aggregate(subject, hint, category).await;
        let provenance = result.provenance();
        self.cache.put(&key, &result.normalized_text, provenance).await;

        LookupOutcome {
            text: result.normalized_text,
            cache_hit: false,
            provenance: (!result.raw_fragments.is_empty()).then_some(provenance),
            stages: result.stages,
        }
    }
}
