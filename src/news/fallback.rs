// src/news/fallback.rs
use crate::news::types::{ArticleSource, NormalizedArticle};

/// Source tag used when every live source failed.
pub const FALLBACK_SOURCE: &str = "fallback";

/// Static articles served when the whole chain is exhausted. Clearly labelled
/// so the dashboard can badge them as sample content.
pub fn fallback_articles() -> Vec<NormalizedArticle> {
    let mk = |title: &str, description: &str, slug: &str| NormalizedArticle {
        title: title.to_string(),
        description: description.to_string(),
        url: format!("https://atlasiq.app/sample/{slug}"),
        url_to_image: None,
        published_at: "2025-01-01T00:00:00Z".to_string(),
        author: Some("AtlasIQ".to_string()),
        source: ArticleSource {
            name: "AtlasIQ (sample)".to_string(),
        },
    };

    vec![
        mk(
            "Global markets steady as investors await central bank signals",
            "Live news sources are temporarily unavailable. This is sample content shown while the feed reconnects.",
            "markets-steady",
        ),
        mk(
            "Technology sector continues to lead innovation investment",
            "Live news sources are temporarily unavailable. This is sample content shown while the feed reconnects.",
            "technology-investment",
        ),
        mk(
            "International leaders meet to discuss climate and trade cooperation",
            "Live news sources are temporarily unavailable. This is sample content shown while the feed reconnects.",
            "leaders-meet",
        ),
    ]
}
