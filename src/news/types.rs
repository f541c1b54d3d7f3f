// src/news/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_QUERY: &str = "latest";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One news search as issued by the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub q: String,
    pub language: String,
    pub page_size: u32,
    pub page: u32,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            q: DEFAULT_QUERY.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

impl Query {
    /// Build from optional request params, applying defaults and clamps.
    pub fn from_params(
        q: Option<&str>,
        language: Option<&str>,
        page_size: Option<u32>,
        page: Option<u32>,
    ) -> Self {
        let pick = |v: Option<&str>, d: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(d)
                .to_string()
        };
        Self {
            q: pick(q, DEFAULT_QUERY),
            language: pick(language, DEFAULT_LANGUAGE).to_ascii_lowercase(),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            page: page.unwrap_or(1).max(1),
        }
    }

    /// Zero-based item offset of the first result on this page.
    pub fn offset(&self) -> u32 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArticleSource {
    pub name: String,
}

/// Canonical article shape served to the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedArticle {
    pub title: String,
    pub description: String,
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub author: Option<String>,
    pub source: ArticleSource,
}

impl NormalizedArticle {
    /// URL-safe key derived from the title, used by the article cache.
    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

const SLUG_MAX: usize = 80;

pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(SLUG_MAX));
    let mut pending_dash = false;
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if out.len() >= SLUG_MAX {
            break;
        }
    }
    out.truncate(SLUG_MAX);
    out.trim_end_matches('-').to_string()
}

/// Why one source attempt did not produce articles.
#[derive(Debug, thiserror::Error)]
pub enum SourceFailure {
    #[error("not configured (missing credential)")]
    NotConfigured,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("could not decode upstream body: {0}")]
    Decode(String),
    #[error("upstream returned no articles")]
    Empty,
}

/// One entry of the fallback chain.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Identity reported back to callers when this source wins.
    fn name(&self) -> &'static str;

    /// Configuration guard; `false` skips the source without a network call.
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<NormalizedArticle>, SourceFailure>;
}
