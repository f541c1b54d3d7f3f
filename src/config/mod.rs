// src/config/mod.rs
//! Service configuration: TOML file + environment.
//!
//! Lookup order for the file:
//! 1) $ATLASIQ_CONFIG_PATH (must exist if set)
//! 2) config/atlasiq.toml
//! 3) built-in defaults
//!
//! Upstream credentials never live in the file; they come from
//! `NEWS_API_KEY`, `NEWSDATA_API_KEY` and `WORLDNEWS_API_KEY`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::MAX_TTL_SECS;

/// Articles older than this are never served, whatever the config says.
pub const MAX_ARTICLE_TTL_HOURS: i64 = 30 * 24;

pub const ENV_CONFIG_PATH: &str = "ATLASIQ_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/atlasiq.toml";

pub const ENV_NEWSAPI_KEY: &str = "NEWS_API_KEY";
pub const ENV_NEWSDATA_KEY: &str = "NEWSDATA_API_KEY";
pub const ENV_WORLDNEWS_KEY: &str = "WORLDNEWS_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub upstreams: UpstreamConfig,
    pub news: NewsConfig,
    pub rss: RssConfig,
    pub translate: TranslateConfig,
    pub prices: PricesConfig,
    pub store: StoreConfig,
    #[serde(skip)]
    pub keys: ApiKeys,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 4,
            timeout_secs: 10,
            user_agent: "atlasiq-proxy/0.1".to_string(),
        }
    }
}

/// Base URLs of every upstream. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub newsapi: String,
    pub newsdata: String,
    pub worldnews: String,
    pub coingecko: String,
    pub ipapi: String,
    pub google_translate: String,
    pub mymemory: String,
    pub lingva: String,
    pub libretranslate: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            newsapi: "https://newsapi.org".to_string(),
            newsdata: "https://newsdata.io".to_string(),
            worldnews: "https://api.worldnewsapi.com".to_string(),
            coingecko: "https://api.coingecko.com".to_string(),
            ipapi: "https://ipapi.co".to_string(),
            google_translate: "https://translate.googleapis.com".to_string(),
            mymemory: "https://api.mymemory.translated.net".to_string(),
            lingva: "https://lingva.ml".to_string(),
            libretranslate: "https://libretranslate.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Feeds consulted by the last live source of the chain; empty disables it.
    pub rss_feeds: Vec<String>,
    /// Freshness window for articles stored in the article cache.
    pub article_ttl_hours: i64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            rss_feeds: vec![
                "https://feeds.bbci.co.uk/news/world/rss.xml".to_string(),
                "https://feeds.npr.org/1004/rss.xml".to_string(),
            ],
            article_ttl_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    /// Hostnames the RSS relay may fetch from; subdomains are accepted too.
    pub allowed_domains: Vec<String>,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            allowed_domains: [
                "bbci.co.uk",
                "bbc.co.uk",
                "npr.org",
                "aljazeera.com",
                "theguardian.com",
                "nytimes.com",
                "reuters.com",
                "cnn.com",
                "dw.com",
                "france24.com",
                "un.org",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Backend names tried in order: "google", "mymemory", "lingva", "libretranslate".
    pub backends: Vec<String>,
    pub cache_ttl_secs: i64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            backends: vec!["google".to_string()],
            cache_ttl_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    pub cache_ttl_secs: i64,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self { cache_ttl_secs: 60 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache/store"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub newsapi: Option<String>,
    pub newsdata: Option<String>,
    pub worldnews: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            newsapi: read(ENV_NEWSAPI_KEY),
            newsdata: read(ENV_NEWSDATA_KEY),
            worldnews: read(ENV_WORLDNEWS_KEY),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// File per the lookup order above, then credentials from the environment.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        cfg.keys = ApiKeys::from_env();
        Ok(cfg)
    }

    fn sanitized(mut self) -> Self {
        self.rss.allowed_domains = self
            .rss
            .allowed_domains
            .iter()
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        self.translate.backends = self
            .translate
            .backends
            .iter()
            .map(|b| b.trim().to_ascii_lowercase())
            .filter(|b| !b.is_empty())
            .collect();
        if self.translate.backends.is_empty() {
            self.translate.backends = TranslateConfig::default().backends;
        }
        if self.news.article_ttl_hours <= 0 {
            self.news.article_ttl_hours = NewsConfig::default().article_ttl_hours;
        }
        self.news.article_ttl_hours = self.news.article_ttl_hours.min(MAX_ARTICLE_TTL_HOURS);
        self.translate.cache_ttl_secs = self.translate.cache_ttl_secs.clamp(0, MAX_TTL_SECS);
        self.prices.cache_ttl_secs = self.prices.cache_ttl_secs.clamp(0, MAX_TTL_SECS);
        self
    }
}
