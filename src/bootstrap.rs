// src/bootstrap.rs
//! Wires config → concrete collaborators → `LookupService`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cache::{CacheStore, MemoryStore, RedisStore, ResultCache};
use crate::config::LookupConfig;
use crate::fetch::{HttpFetcher, SharedClient};
use crate::formatter::QueryFormatter;
use crate::gate::SufficiencyGate;
use crate::orchestrator::FetchOrchestrator;
use crate::profiles::csv::CsvProfileStore;
use crate::profiles::ProfileStore;
use crate::search::GoogleSearch;
use crate::service::LookupService;
use crate::summarize::{build_summarizer, DynSummarizer};

pub struct LookupRuntime {
    pub config: LookupConfig,
    pub service: LookupService,
    pub summarizer: DynSummarizer,
}

impl LookupRuntime {
    /// Load config from the default path and build everything.
    pub async fn from_env() -> Result<Self> {
        let cfg = LookupConfig::load()?;
        Self::from_config(cfg).await
    }

    pub async fn from_config(config: LookupConfig) -> Result<Self> {
        let catalog = Arc::new(config.catalog()?);
        let aliases = Arc::new(config.alias_table()?);
        let profiles = build_profiles(&config).await?;
        let client = SharedClient::new(config.fetch.user_agent.clone());

        let formatter = Arc::new(
            QueryFormatter::new(aliases, profiles.clone()).with_group_priority(config.group_priority.clone()),
        );
        let mut orchestrator = FetchOrchestrator::new(
            catalog.clone(),
            formatter,
            Arc::new(HttpFetcher::new(client.clone())),
            profiles.clone(),
        )
        .with_gate(SufficiencyGate::new(config.gate.clone()))
        .with_concurrency(config.fetch.max_concurrent);

        if config.search.enabled {
            let creds = config.search.parsed_credentials();
            if creds.is_empty() {
                warn!("search enabled but no usable credentials; search supplement off");
            } else {
                let search = GoogleSearch::new(client.clone(), creds)
                    .with_endpoint(config.search.endpoint.clone())
                    .with_timeout(Duration::from_secs(config.search.timeout_seconds.max(1)))
                    .with_results_per_query(config.search.results_per_query);
                orchestrator = orchestrator.with_search(Arc::new(search));
            }
        }

        let store: Arc<dyn CacheStore> = match config.cache.redis_url.as_deref() {
            Some(url) => Arc::new(RedisStore::open(url).context("opening redis cache")?),
            None => Arc::new(MemoryStore::new()),
        };
        let cache = ResultCache::new(store.clone(), config.cache.ttl);
        let summarizer = build_summarizer(&config.summarizer);

        // Safe diagnostics only: no keys, no URLs with credentials.
        info!(
            sources = catalog.len(),
            profiles = profiles.name(),
            cache = store.name(),
            search = config.search.enabled,
            summarizer = summarizer.provider_name(),
            "lookup runtime ready"
        );

        Ok(Self {
            service: LookupService::new(Arc::new(orchestrator), cache),
            summarizer,
            config,
        })
    }
}

async fn build_profiles(config: &LookupConfig) -> Result<Arc<dyn ProfileStore>> {
    #[cfg(feature = "postgres")]
    if let Some(url) = config.profiles.database_url.as_deref() {
        let store = crate::profiles::postgres::PgProfileStore::connect(url).await?;
        return Ok(Arc::new(store));
    }
    #[cfg(not(feature = "postgres"))]
    if config.profiles.database_url.is_some() {
        warn!("database_url set but built without the `postgres` feature; ignoring");
    }

    match config.profiles.csv_path.as_deref() {
        Some(path) => Ok(Arc::new(CsvProfileStore::from_path(path)?)),
        None => Ok(Arc::new(CsvProfileStore::empty())),
    }
}
