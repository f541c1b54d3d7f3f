// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geo;
pub mod metrics;
pub mod news;
pub mod preferences;
pub mod prices;
pub mod rss_relay;
pub mod store;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::ApiError;

use tracing::info;

/// Build the full Router from config on disk + environment.
///
/// Loads `.env` (no-op when absent), resolves `AppConfig`, sweeps persisted
/// caches once, and wires every route. The Prometheus `/metrics` route is not
/// included; the binary merges it after installing the recorder.
pub async fn app() -> anyhow::Result<axum::Router> {
    let _ = dotenvy::dotenv();
    let cfg = AppConfig::load_default()?;
    info!(
        newsapi = cfg.keys.newsapi.is_some(),
        newsdata = cfg.keys.newsdata.is_some(),
        worldnews = cfg.keys.worldnews.is_some(),
        rss_feeds = cfg.news.rss_feeds.len(),
        "news sources configured"
    );
    let state = AppState::from_config(cfg)?;
    state.sweep_caches();
    Ok(router(state))
}
