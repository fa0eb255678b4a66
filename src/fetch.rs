// src/fetch.rs
//! Page fetching behind a trait so the orchestrator can be driven by fakes in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http client unavailable: {0}")]
    Client(String),
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body at `url`. `timeout` bounds the whole request.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}

/// One process-wide pooled client, built on first use and shared by clones.
#[derive(Clone)]
pub struct SharedClient {
    cell: Arc<OnceCell<reqwest::Client>>,
    user_agent: String,
}

impl SharedClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(OnceCell::new()),
            user_agent: user_agent.into(),
        }
    }

    pub fn get(&self) -> Result<&reqwest::Client, FetchError> {
        self.cell.get_or_try_init(|| {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers.insert(
                reqwest::header::ACCEPT_LANGUAGE,
                reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
            );
            debug!("building shared http client");
            reqwest::Client::builder()
                .user_agent(self.user_agent.clone())
                .default_headers(headers)
                .redirect(reqwest::redirect::Policy::limited(5))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .map_err(|e| FetchError::Client(e.to_string()))
        })
    }
}

impl Default for SharedClient {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: SharedClient,
}

impl HttpFetcher {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SharedClient {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let client = self.client.get()?;
        let resp = client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().await.map_err(|e| classify(e, timeout))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(e)
    }
}
