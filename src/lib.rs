// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aliases;
pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod formatter;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod profiles;
pub mod search;
pub mod service;
pub mod summarize;
pub mod types;

pub use crate::api::create_router;
pub use crate::orchestrator::{AggregationResult, FetchOrchestrator};
pub use crate::service::{LookupOutcome, LookupService};
pub use crate::types::{Category, Fragment, Origin};

use axum::Router;

/// Build the full HTTP app (lookup routes + `/metrics`) from `config/lookup.toml`.
pub async fn app() -> anyhow::Result<Router> {
    let metrics = crate::metrics::Metrics::init()?;
    let rt = bootstrap::LookupRuntime::from_env().await?;
    Ok(app_with(rt, &metrics))
}

/// Same as [`app`] but with an already built runtime (tests inject fakes this way).
pub fn app_with(rt: bootstrap::LookupRuntime, metrics: &crate::metrics::Metrics) -> Router {
    let state = api::AppState {
        service: rt.service,
        summarizer: rt.summarizer,
    };
    create_router(state).merge(metrics.router())
}
