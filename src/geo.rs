// src/geo.rs
//! ipapi.co lookup for the caller's address. No static substitute exists for a
//! user's location, so failures are reported, not masked.

use anyhow::{anyhow, Context, Result};
use axum::http::HeaderMap;
use serde_json::Value;
use std::net::IpAddr;

/// Client IP as seen by the edge: first `x-forwarded-for` hop, then `x-real-ip`.
/// Values that do not parse as an IP address are ignored.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header_ip = |name: &str, first_hop: bool| -> Option<IpAddr> {
        let raw = headers.get(name)?.to_str().ok()?;
        let candidate = if first_hop {
            raw.split(',').next()?
        } else {
            raw
        };
        candidate.trim().parse::<IpAddr>().ok()
    };
    header_ip("x-forwarded-for", true)
        .or_else(|| header_ip("x-real-ip", false))
        .map(|ip| ip.to_string())
}

pub struct GeoService {
    client: reqwest::Client,
    base: String,
}

impl GeoService {
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// Location for `ip`, or for the requesting address when `None`.
    pub async fn locate(&self, ip: Option<&str>) -> Result<Value> {
        let url = match ip {
            Some(ip) => format!("{}/{}/json/", self.base, ip),
            None => format!("{}/json/", self.base),
        };
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("ipapi request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("ipapi returned HTTP {}", status.as_u16()));
        }
        let body: Value = resp.json().await.context("ipapi body")?;

        // ipapi reports reserved/invalid addresses as 200 + {"error": true, "reason": ...}
        if body.get("error").and_then(Value::as_bool) == Some(true) {
            let reason = body
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("lookup rejected");
            return Err(anyhow!("ipapi: {reason}"));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_first_hop_wins() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.7 , 10.0.0.1"));
        h.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&h).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn real_ip_is_second_choice() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static(""));
        h.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(client_ip(&h).as_deref(), Some("198.51.100.2"));
        assert_eq!(client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn non_ip_values_are_ignored() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1/../x?"));
        assert_eq!(client_ip(&h), None);

        h.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(client_ip(&h).as_deref(), Some("2001:db8::1"));
    }
}
