// src/prices.rs
//! CoinGecko simple-price lookup with a short in-memory cache and a static
//! fallback map. Callers always get a price map; upstream trouble only changes
//! where it came from.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Duration as ChronoDuration;
use serde_json::{json, Value};

use crate::cache::{ttl_from_secs, Clock, SystemClock, TtlCache};

pub const DEFAULT_IDS: &str = "bitcoin,ethereum";
pub const DEFAULT_VS_CURRENCIES: &str = "usd";

/// Where a price map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrigin {
    Live,
    Cache,
    Fallback,
}

impl PriceOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceOrigin::Live => "coingecko",
            PriceOrigin::Cache => "cache",
            PriceOrigin::Fallback => "fallback",
        }
    }
}

/// Static map served when CoinGecko is unavailable.
pub fn fallback_prices() -> Value {
    json!({
        "bitcoin": { "usd": 43250.0, "usd_24h_change": 2.5 },
        "ethereum": { "usd": 2650.0, "usd_24h_change": 1.8 }
    })
}

/// Lowercase, trim and de-blank a comma list; `default` if nothing is left.
pub fn normalize_list(raw: Option<&str>, default: &str) -> String {
    let items: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        default.to_string()
    } else {
        items.join(",")
    }
}

pub struct PriceService {
    client: reqwest::Client,
    base: String,
    cache: TtlCache<String, Value>,
    ttl: ChronoDuration,
}

impl PriceService {
    pub fn new(client: reqwest::Client, base: &str, ttl_secs: i64) -> Self {
        Self::with_clock(client, base, ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: reqwest::Client,
        base: &str,
        ttl_secs: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            cache: TtlCache::with_clock("prices", clock),
            ttl: ttl_from_secs(ttl_secs),
        }
    }

    /// Price map for `ids` in `vs_currencies` (already normalized lists).
    pub async fn lookup(&self, ids: &str, vs_currencies: &str) -> (Value, PriceOrigin) {
        let key = format!("{ids}|{vs_currencies}");
        if let Some(hit) = self.cache.get(&key) {
            return (hit, PriceOrigin::Cache);
        }

        match self.fetch(ids, vs_currencies).await {
            Ok(body) => {
                self.cache.put(key, body.clone(), self.ttl);
                (body, PriceOrigin::Live)
            }
            Err(e) => {
                tracing::warn!(target: "prices", error = %format!("{e:#}"), "coingecko failed; serving fallback");
                metrics::counter!("prices_fallback_total").increment(1);
                (fallback_prices(), PriceOrigin::Fallback)
            }
        }
    }

    async fn fetch(&self, ids: &str, vs_currencies: &str) -> Result<Value> {
        let resp = self
            .client
            .get(format!("{}/api/v3/simple/price", self.base))
            .query(&[
                ("ids", ids),
                ("vs_currencies", vs_currencies),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .context("coingecko request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("coingecko returned HTTP {}", status.as_u16()));
        }
        let body: Value = resp.json().await.context("coingecko body")?;
        if !body.is_object() {
            return Err(anyhow!("coingecko body is not an object"));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_normalization() {
        assert_eq!(normalize_list(Some(" Bitcoin, ,SOLANA "), DEFAULT_IDS), "bitcoin,solana");
        assert_eq!(normalize_list(Some(" , "), DEFAULT_IDS), DEFAULT_IDS);
        assert_eq!(normalize_list(None, DEFAULT_VS_CURRENCIES), "usd");
    }

    #[test]
    fn fallback_has_two_entries_with_change() {
        let fb = fallback_prices();
        let obj = fb.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj["bitcoin"]["usd_24h_change"].is_number());
    }
}
