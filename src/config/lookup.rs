// src/config/lookup.rs
//! `config/lookup.toml` loader.
//!
//! Every section is optional; missing keys fall back to built-in defaults.
//! Secrets follow the `"ENV"` convention: the literal value `ENV` means
//! "read the matching environment variable".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::aliases::{AliasFamily, AliasTable};
use crate::cache::TtlPolicy;
use crate::catalog::{SourceCatalog, SourceDescriptor};
use crate::fetch::DEFAULT_USER_AGENT;
use crate::gate::GateConfig;
use crate::orchestrator::DEFAULT_MAX_CONCURRENT_FETCHES;
use crate::search::{parse_credentials, SearchCredential, DEFAULT_ENDPOINT, DEFAULT_RESULTS_PER_QUERY};

pub const DEFAULT_CONFIG_PATH: &str = "config/lookup.toml";
pub const ENV_CONFIG_PATH: &str = "LOOKUP_CONFIG_PATH";
pub const ENV_SEARCH_CREDENTIALS: &str = "GOOGLE_SEARCH_CREDENTIALS";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

fn is_env_marker(s: &str) -> bool {
    s.trim().eq_ignore_ascii_case("env")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// `"ENV"` → `REDIS_URL`. Absent → in-process memory store.
    pub redis_url: Option<String>,
    #[serde(default)]
    pub ttl: TtlPolicy,
}

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_results() -> u8 {
    DEFAULT_RESULTS_PER_QUERY
}
fn default_search_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// `key:cx,key:cx` or `"ENV"` → `GOOGLE_SEARCH_CREDENTIALS`.
    #[serde(default)]
    pub credentials: String,
    #[serde(default = "default_results")]
    pub results_per_query: u8,
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            credentials: String::new(),
            results_per_query: default_results(),
            timeout_seconds: default_search_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn parsed_credentials(&self) -> Vec<SearchCredential> {
        parse_credentials(&self.credentials)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    pub csv_path: Option<PathBuf>,
    /// `"ENV"` → `DATABASE_URL`. Only used with the `postgres` feature.
    pub database_url: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_daily_limit() -> u32 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// `"ENV"` → `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            daily_limit: default_daily_limit(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub profiles: ProfilesConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    /// Tie-breaker list for ambiguous stage names.
    #[serde(default)]
    pub group_priority: Vec<String>,
    /// Replaces the built-in catalog when non-empty.
    #[serde(default)]
    pub sources: Vec<SourceDescriptor>,
    /// `[aliases.<family>]` tables merged over the built-in seed.
    #[serde(default)]
    pub aliases: HashMap<String, HashMap<String, String>>,
}

impl LookupConfig {
    /// Path from `LOOKUP_CONFIG_PATH`, else `config/lookup.toml`.
    pub fn default_path() -> PathBuf {
        env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load from the default path; a missing file yields defaults (env overrides still apply).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::info!(path = %path.display(), "no lookup config file; using defaults");
            let mut cfg = Self::default();
            cfg.resolve_env()?;
            Ok(cfg)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: LookupConfig = toml::from_str(s)?;
        cfg.resolve_env()?;
        Ok(cfg)
    }

    /// Resolve `"ENV"` markers and threshold overrides; sanitize numeric knobs.
    fn resolve_env(&mut self) -> Result<()> {
        if self.search.enabled && is_env_marker(&self.search.credentials) {
            self.search.credentials = env::var(ENV_SEARCH_CREDENTIALS)
                .map_err(|_| anyhow!("Missing {ENV_SEARCH_CREDENTIALS} env var"))?;
        }
        if let Some(url) = &self.cache.redis_url {
            if is_env_marker(url) {
                // No Redis configured in this environment → memory store.
                self.cache.redis_url = env::var(ENV_REDIS_URL).ok().filter(|u| !u.trim().is_empty());
            }
        }
        if let Some(url) = &self.profiles.database_url {
            if is_env_marker(url) {
                self.profiles.database_url = env::var(ENV_DATABASE_URL).ok().filter(|u| !u.trim().is_empty());
            }
        }

        self.summarizer.provider = self.summarizer.provider.to_lowercase();
        if self.summarizer.enabled && is_env_marker(&self.summarizer.api_key) {
            self.summarizer.api_key = match self.summarizer.provider.as_str() {
                "openai" => env::var(ENV_OPENAI_API_KEY)
                    .map_err(|_| anyhow!("Missing {ENV_OPENAI_API_KEY} env var"))?,
                other => bail!("Unsupported summarizer provider in config: {other}"),
            };
        }

        self.gate.apply_env_overrides();
        if self.fetch.max_concurrent == 0 {
            self.fetch.max_concurrent = default_max_concurrent();
        }
        Ok(())
    }

    /// Built-in catalog, or the configured one when `[[sources]]` is present.
    pub fn catalog(&self) -> Result<SourceCatalog> {
        if self.sources.is_empty() {
            return Ok(SourceCatalog::default_seed());
        }
        SourceCatalog::new(self.sources.clone()).context("invalid [[sources]] in lookup config")
    }

    /// Seed alias tables with config overrides merged on top.
    pub fn alias_table(&self) -> Result<AliasTable> {
        let mut overrides = HashMap::new();
        for (family, entries) in &self.aliases {
            let fam = AliasFamily::from_key(family)
                .ok_or_else(|| anyhow!("unknown alias family `{family}`"))?;
            overrides.insert(fam, entries.clone());
        }
        let mut table = AliasTable::default_seed();
        table.merge(&overrides);
        Ok(table)
    }
}
