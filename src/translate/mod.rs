// src/translate/mod.rs
//! On-demand text translation.
//!
//! Backends are tried in configured order (default: Google only). Results are
//! kept in a process-scoped `TtlCache` keyed by language pair and a hash of the
//! text, so repeated UI strings do not hit the upstream again.

pub mod backends;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::Arc;

use crate::cache::{ttl_from_secs, Clock, SystemClock, TtlCache};
use crate::config::AppConfig;
use backends::{GoogleTranslator, LibreTranslator, LingvaTranslator, MyMemoryTranslator};

pub const AUTO_SOURCE: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub translated_text: String,
    pub detected_language: String,
    pub backend: &'static str,
}

#[async_trait]
pub trait Translator: Send + Sync {
    fn name(&self) -> &'static str;
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation>;
}

/// Build backends listed in config; unknown names are skipped with a warning.
pub fn build_backends(cfg: &AppConfig, client: &reqwest::Client) -> Vec<Box<dyn Translator>> {
    let up = &cfg.upstreams;
    cfg.translate
        .backends
        .iter()
        .filter_map(|name| -> Option<Box<dyn Translator>> {
            match name.as_str() {
                "google" => Some(Box::new(GoogleTranslator::new(client.clone(), &up.google_translate))),
                "mymemory" => Some(Box::new(MyMemoryTranslator::new(client.clone(), &up.mymemory))),
                "lingva" => Some(Box::new(LingvaTranslator::new(client.clone(), &up.lingva))),
                "libretranslate" => {
                    Some(Box::new(LibreTranslator::new(client.clone(), &up.libretranslate)))
                }
                other => {
                    tracing::warn!(target: "translate", backend = other, "unknown translation backend; skipping");
                    None
                }
            }
        })
        .collect()
}

/// Cache key: language pair plus the first 12 hex chars of SHA-256(text).
pub fn cache_key(source: &str, target: &str, text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hash = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut hash, "{:02x}", b);
    }
    format!("{source}:{target}:{hash}")
}

pub struct TranslationService {
    backends: Vec<Box<dyn Translator>>,
    cache: TtlCache<String, Translation>,
    ttl: ChronoDuration,
}

impl TranslationService {
    pub fn new(backends: Vec<Box<dyn Translator>>, ttl_secs: i64) -> Self {
        Self::with_clock(backends, ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backends: Vec<Box<dyn Translator>>,
        ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backends,
            cache: TtlCache::with_clock("translations", clock),
            ttl: ttl_from_secs(ttl_secs),
        }
    }

    /// Translate `text`. The flag is `true` when served from cache.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<(Translation, bool)> {
        let key = cache_key(source, target, text);
        if let Some(hit) = self.cache.get(&key) {
            return Ok((hit, true));
        }

        let mut last_err = None;
        for backend in &self.backends {
            match backend.translate(text, source, target).await {
                Ok(t) => {
                    self.cache.put(key, t.clone(), self.ttl);
                    return Ok((t, false));
                }
                Err(e) => {
                    tracing::warn!(target: "translate", backend = backend.name(), error = %format!("{e:#}"), "translation backend failed");
                    metrics::counter!("translate_failures_total", "backend" => backend.name())
                        .increment(1);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no translation backend configured")))
    }

    /// Drop expired translations; called opportunistically.
    pub fn sweep(&self) -> usize {
        self.cache.sweep()
    }
}
