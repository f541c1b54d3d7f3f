// src/metrics.rs
use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        metrics::describe_counter!("cache_hits_total", "Cache reads served from a fresh entry.");
        metrics::describe_counter!(
            "cache_misses_total",
            "Cache reads that found nothing or a stale entry."
        );
        metrics::describe_counter!("prices_fallback_total", "Price lookups answered from the static map.");
        metrics::describe_counter!(
            "translate_failures_total",
            "Failed translation backend attempts, labelled by backend."
        );

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
