// src/news/mod.rs
//! # News aggregation
//! Ordered fallback over interchangeable news sources.
//!
//! Sources are tried strictly in order, one attempt each. The first attempt that
//! returns at least one article wins. Failures (missing credential, transport
//! error, non-2xx, undecodable body, zero articles) are logged and skipped.
//! When nothing succeeds the static fallback set is returned; callers never see
//! an error from this path.

pub mod fallback;
pub mod normalize;
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

pub use fallback::{fallback_articles, FALLBACK_SOURCE};
pub use types::{NewsSource, NormalizedArticle, Query, SourceFailure};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "news_source_failures_total",
            "Failed news source attempts, labelled by source."
        );
        describe_counter!(
            "news_source_success_total",
            "News requests satisfied by a live source."
        );
        describe_counter!(
            "news_fallback_total",
            "News requests answered with the static fallback set."
        );
    });
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregated {
    pub articles: Vec<NormalizedArticle>,
    /// Name of the winning source, or `"fallback"`.
    pub source: String,
}

impl Aggregated {
    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}

/// Try `sources` in order and return the first non-empty result.
pub async fn aggregate(sources: &[Box<dyn NewsSource>], query: &Query) -> Aggregated {
    ensure_metrics_described();

    for src in sources {
        let outcome = if src.is_configured() {
            src.fetch(query).await.and_then(|articles| {
                if articles.is_empty() {
                    Err(SourceFailure::Empty)
                } else {
                    Ok(articles)
                }
            })
        } else {
            Err(SourceFailure::NotConfigured)
        };

        match outcome {
            Ok(articles) => {
                tracing::debug!(
                    target: "news",
                    source = src.name(),
                    count = articles.len(),
                    "news source satisfied request"
                );
                counter!("news_source_success_total", "source" => src.name()).increment(1);
                return Aggregated {
                    articles,
                    source: src.name().to_string(),
                };
            }
            Err(e) => {
                tracing::warn!(target: "news", source = src.name(), reason = %e, "news source failed");
                counter!("news_source_failures_total", "source" => src.name()).increment(1);
            }
        }
    }

    tracing::warn!(target: "news", tried = sources.len(), "all news sources failed; serving fallback");
    counter!("news_fallback_total").increment(1);
    Aggregated {
        articles: fallback_articles(),
        source: FALLBACK_SOURCE.to_string(),
    }
}
