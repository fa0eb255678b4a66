// src/cache.rs
//! Result cache in front of the orchestrator.
//!
//! Key = `{MEMBER|GROUP}:{subject}` (plus `@{hint}` when a group hint was given),
//! value = normalized text. TTL depends on where the text came from: the local
//! dataset outlives curated sources, which outlive general web/search text.
//! Store failures are logged and treated as misses; they never fail a lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::types::{Category, Fragment, Origin};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    /// Redis `SET key value EX ttl` semantics.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    fn name(&self) -> &'static str;
}

/// In-process store for tests and deployments without Redis.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some((_, expires)) if *expires <= Utc::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), (value.to_string(), Utc::now() + ttl));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const REDIS_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
const REDIS_RETRIES: usize = 1;

/// Redis-backed store; the connection manager is opened lazily and reconnects on its own.
/// Connect and response waits are bounded so a dead server degrades to misses.
pub struct RedisStore {
    client: redis::Client,
    conn: tokio::sync::OnceCell<redis::aio::ConnectionManager>,
}

impl RedisStore {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            conn: tokio::sync::OnceCell::new(),
        })
    }

    async fn conn(&self) -> Result<redis::aio::ConnectionManager, CacheError> {
        let mgr = self
            .conn
            .get_or_try_init(|| async {
                let cfg = redis::aio::ConnectionManagerConfig::new()
                    .set_connection_timeout(REDIS_CONNECT_TIMEOUT)
                    .set_response_timeout(REDIS_RESPONSE_TIMEOUT)
                    .set_number_of_retries(REDIS_RETRIES);
                // Retries back off between attempts; cap the whole handshake too.
                let budget = REDIS_CONNECT_TIMEOUT * (REDIS_RETRIES as u32 + 2);
                match tokio::time::timeout(budget, self.client.get_connection_manager_with_config(cfg)).await {
                    Ok(res) => res.map_err(CacheError::from),
                    Err(_) => Err(CacheError::Unavailable("redis connect timed out".into())),
                }
            })
            .await?;
        Ok(mgr.clone())
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn().await?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Where a normalized text came from, for TTL selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Database,
    Curated,
    General,
}

impl Provenance {
    /// Every fragment from the dataset → Database; every fragment curated → Curated.
    pub fn of(fragments: &[Fragment]) -> Self {
        if !fragments.is_empty() && fragments.iter().all(|f| f.origin == Origin::Database) {
            Provenance::Database
        } else if !fragments.is_empty() && fragments.iter().all(|f| f.origin.is_curated()) {
            Provenance::Curated
        } else {
            Provenance::General
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provenance::Database => "database",
            Provenance::Curated => "curated",
            Provenance::General => "general",
        }
    }
}

fn default_database_ttl() -> u64 {
    24 * 3600
}
fn default_curated_ttl() -> u64 {
    6 * 3600
}
fn default_general_ttl() -> u64 {
    3600
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    #[serde(default = "default_database_ttl")]
    pub database_secs: u64,
    #[serde(default = "default_curated_ttl")]
    pub curated_secs: u64,
    #[serde(default = "default_general_ttl")]
    pub general_secs: u64,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            database_secs: default_database_ttl(),
            curated_secs: default_curated_ttl(),
            general_secs: default_general_ttl(),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, p: Provenance) -> Duration {
        Duration::from_secs(match p {
            Provenance::Database => self.database_secs,
            Provenance::Curated => self.curated_secs,
            Provenance::General => self.general_secs,
        })
    }
}

/// Upper bound on a single cache read or write.
pub const DEFAULT_CACHE_OP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    policy: TtlPolicy,
    op_timeout: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, policy: TtlPolicy) -> Self {
        Self { store, policy, op_timeout: DEFAULT_CACHE_OP_TIMEOUT }
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), TtlPolicy::default())
    }

    pub fn policy(&self) -> &TtlPolicy {
        &self.policy
    }

    pub fn key(category: Category, subject: &str, hint: Option<&str>) -> String {
        let subject = subject.trim().to_lowercase();
        match hint.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) => format!("{}:{}@{}", category.key_prefix(), subject, h.to_lowercase()),
            None => format!("{}:{}", category.key_prefix(), subject),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let res = tokio::time::timeout(self.op_timeout, self.store.get(key))
            .await
            .unwrap_or_else(|_| Err(CacheError::Unavailable("get timed out".into())));
        match res {
            Ok(Some(v)) => {
                metrics::counter!("lookup_cache_hits_total").increment(1);
                Some(v)
            }
            Ok(None) => {
                metrics::counter!("lookup_cache_misses_total").increment(1);
                None
            }
            Err(e) => {
                warn!(error = %e, store = self.store.name(), "cache get failed; treating as miss");
                metrics::counter!("lookup_cache_misses_total").increment(1);
                None
            }
        }
    }

    /// Store `text` under `key`. Empty text is never cached.
    pub async fn put(&self, key: &str, text: &str, provenance: Provenance) {
        if text.trim().is_empty() {
            return;
        }
        let ttl = self.policy.ttl_for(provenance);
        let res = tokio::time::timeout(self.op_timeout, self.store.set_ex(key, text, ttl))
            .await
            .unwrap_or_else(|_| Err(CacheError::Unavailable("put timed out".into())));
        match res {
            Ok(()) => debug!(ttl_secs = ttl.as_secs(), provenance = provenance.label(), "cached"),
            Err(e) => warn!(error = %e, store = self.store.name(), "cache put failed"),
        }
    }
}
