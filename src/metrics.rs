use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe the lookup series.
    pub fn init() -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe() {
    describe_counter!("lookup_cache_hits_total", "Lookups answered from the result cache");
    describe_counter!("lookup_cache_misses_total", "Lookups that had to aggregate");
    describe_counter!("lookup_source_errors_total", "Per-source fetch failures (label: source)");
    describe_counter!("lookup_tier_stop_total", "Aggregations stopped early by the gate (label: tier)");
    describe_counter!("lookup_search_rotations_total", "Search credentials rejected and rotated past");
    describe_histogram!("lookup_aggregate_ms", Unit::Milliseconds, "Wall time of one aggregation");
}
