//! Summarizer adapter: normalized lookup text → short answer.
//!
//! The lookup core only produces text; turning it into a reply is delegated to an
//! external model behind [`Summarizer`]. Empty context never reaches a provider:
//! it short-circuits to [`NOT_FOUND_REPLY`].

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::lookup::SummarizerConfig;

pub const NOT_FOUND_REPLY: &str = "NOT_FOUND";
pub const MAX_SUMMARY_CHARS: usize = 700;
/// Context sent to the provider is cut to this many chars.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub provider: String,
}

impl Summary {
    pub fn is_not_found(&self) -> bool {
        self.text == NOT_FOUND_REPLY
    }
}

pub trait Summarizer: Send + Sync {
    /// Summarize `context` for `subject`. `None` when the provider is off or failed.
    fn summarize<'a>(
        &'a self,
        subject: &'a str,
        context: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Summary>> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Empty context → NOT_FOUND without calling the provider.
pub async fn summarize_or_not_found(
    client: &dyn Summarizer,
    subject: &str,
    context: &str,
) -> Option<Summary> {
    if context.trim().is_empty() {
        return Some(Summary {
            text: NOT_FOUND_REPLY.to_string(),
            provider: client.provider_name().to_string(),
        });
    }
    client.summarize(subject, context).await
}

/// Build from config. `LOOKUP_SUMMARIZER=mock` forces the deterministic mock.
pub fn build_summarizer(cfg: &SummarizerConfig) -> DynSummarizer {
    if std::env::var("LOOKUP_SUMMARIZER").is_ok_and(|v| v == "mock") {
        return Arc::new(MockSummarizer::new("Mock summary."));
    }
    if !cfg.enabled {
        return Arc::new(DisabledSummarizer);
    }
    match cfg.provider.as_str() {
        "openai" => match OpenAiSummarizer::new(cfg.api_key.clone(), cfg.model.clone()) {
            Ok(p) => Arc::new(DailyLimited::new(p, cfg.daily_limit)),
            Err(e) => {
                warn!(error = %e, "openai summarizer unavailable; disabling");
                Arc::new(DisabledSummarizer)
            }
        },
        other => {
            warn!(provider = other, "unknown summarizer provider; disabling");
            Arc::new(DisabledSummarizer)
        }
    }
}

/// Chat Completions provider.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: String, model: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kpop-lookup/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            api_key,
            model,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn call(&self, subject: &str, context: &str) -> Option<Summary> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = format!(
            "You answer K-pop trivia. Using ONLY the provided text, write a short profile of the subject \
             (group, birthday, position, agency, social handles when present). \
             If the text is not about the subject, reply exactly {NOT_FOUND_REPLY}."
        );
        let context = truncate_chars(context, MAX_CONTEXT_CHARS);
        let user = format!("Subject: {subject}\n\nText:\n{context}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 300,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| warn!(error = %e, "summarizer request failed"))
            .ok()?;
        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "summarizer rejected request");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.first().map(|c| c.message.content.as_str()).unwrap_or("");
        let text = sanitize_summary(content);
        (!text.is_empty()).then(|| Summary {
            text,
            provider: "openai".to_string(),
        })
    }
}

impl Summarizer for OpenAiSummarizer {
    fn summarize<'a>(
        &'a self,
        subject: &'a str,
        context: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Summary>> + Send + 'a>> {
        Box::pin(self.call(subject, context))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

pub struct DisabledSummarizer;

impl Summarizer for DisabledSummarizer {
    fn summarize<'a>(
        &'a self,
        _subject: &'a str,
        _context: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Summary>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns a fixed text and counts calls.
pub struct MockSummarizer {
    fixed: String,
    calls: Mutex<usize>,
}

impl MockSummarizer {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|g| *g).unwrap_or(0)
    }
}

impl Summarizer for MockSummarizer {
    fn summarize<'a>(
        &'a self,
        _subject: &'a str,
        _context: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Summary>> + Send + 'a>> {
        if let Ok(mut g) = self.calls.lock() {
            *g += 1;
        }
        let out = Summary {
            text: self.fixed.clone(),
            provider: "mock".to_string(),
        };
        Box::pin(async move { Some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Caps real provider calls per UTC day.
pub struct DailyLimited<S: Summarizer> {
    inner: S,
    max: u32,
    counter: Mutex<(NaiveDate, u32)>,
}

impl<S: Summarizer> DailyLimited<S> {
    pub fn new(inner: S, max: u32) -> Self {
        Self {
            inner,
            max,
            counter: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }

    /// Reserve one call for today; false when the limit is reached.
    fn try_reserve(&self) -> bool {
        let Ok(mut g) = self.counter.lock() else {
            return false;
        };
        let today = Utc::now().date_naive();
        if g.0 != today {
            *g = (today, 0);
        }
        if g.1 >= self.max {
            return false;
        }
        g.1 += 1;
        true
    }
}

impl<S: Summarizer> Summarizer for DailyLimited<S> {
    fn summarize<'a>(
        &'a self,
        subject: &'a str,
        context: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Summary>> + Send + 'a>> {
        if !self.try_reserve() {
            debug!(provider = self.inner.provider_name(), "daily summarizer limit reached");
            return Box::pin(async { None });
        }
        self.inner.summarize(subject, context)
    }
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Single line, no control chars, capped at [`MAX_SUMMARY_CHARS`]; whitespace collapsed.
pub fn sanitize_summary(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_SUMMARY_CHARS * 4));
    let mut prev_space = false;
    let mut count = 0usize;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                count += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            count += 1;
            prev_space = false;
        }
        if count >= MAX_SUMMARY_CHARS {
            break;
        }
    }
    out.trim().to_string()
}
