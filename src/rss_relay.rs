// src/rss_relay.rs
//! CORS relay for RSS feeds on an allow-list of publisher domains.

use axum::body::Bytes;
use axum::http::StatusCode;
use url::Url;

use crate::error::ApiError;

pub const FEED_CACHE_CONTROL: &str = "s-maxage=300, stale-while-revalidate=600";
const DEFAULT_FEED_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// True when `host` is `domain` or a subdomain of it.
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed.iter().any(|d| {
        host == *d
            || host
                .strip_suffix(d.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
    })
}

const MAX_FEED_REDIRECTS: usize = 5;

/// Redirect policy for feed clients: a hop is followed only when its target
/// is itself an allow-listed http(s) host. Anything else stops the chain and
/// the 3xx response is returned as-is.
pub fn redirect_policy(allowed: Vec<String>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_FEED_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let target = attempt.url();
        let permitted = matches!(target.scheme(), "http" | "https")
            && target
                .host_str()
                .is_some_and(|h| host_allowed(h, &allowed));
        if permitted {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Parse and vet a feed URL supplied by the caller.
pub fn validate_feed_url(raw: Option<&str>, allowed: &[String]) -> Result<Url, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing url parameter".to_string()))?;

    let url = Url::parse(raw).map_err(|_| ApiError::BadRequest("Invalid url parameter".to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::BadRequest("Only http(s) feeds are supported".to_string()));
    }

    let host = url.host_str().unwrap_or_default();
    if !host_allowed(host, allowed) {
        return Err(ApiError::Forbidden {
            allowed: allowed.to_vec(),
        });
    }
    Ok(url)
}

#[derive(Debug)]
pub struct FeedBody {
    pub content_type: String,
    pub body: Bytes,
}

pub struct RssRelay {
    client: reqwest::Client,
    allowed: Vec<String>,
}

impl RssRelay {
    pub fn new(client: reqwest::Client, allowed: Vec<String>) -> Self {
        Self { client, allowed }
    }

    pub async fn fetch(&self, raw_url: Option<&str>) -> Result<FeedBody, ApiError> {
        let url = validate_feed_url(raw_url, &self.allowed)?;
        tracing::debug!(target: "rss", url = %url, "relaying feed");

        let resp = self
            .client
            .get(url.clone())
            .header(
                "accept",
                "application/rss+xml, application/atom+xml, application/xml, text/xml, */*",
            )
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "rss", url = %url, error = %e, "feed fetch failed");
                ApiError::Internal(format!("Failed to fetch feed: {e}"))
            })?;

        let status = resp.status();
        if status.is_redirection() {
            let location = resp
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::warn!(target: "rss", url = %url, location, "feed redirected off the allow-list");
            return Err(ApiError::Forbidden {
                allowed: self.allowed.clone(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: StatusCode::from_u16(status.as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                message: format!("Upstream feed returned HTTP {}", status.as_u16()),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_FEED_CONTENT_TYPE)
            .to_string();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to read feed: {e}")))?;

        Ok(FeedBody { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec!["bbci.co.uk".to_string(), "npr.org".to_string()]
    }

    #[test]
    fn exact_and_subdomains_pass() {
        assert!(host_allowed("bbci.co.uk", &allowed()));
        assert!(host_allowed("feeds.bbci.co.uk", &allowed()));
        assert!(host_allowed("FEEDS.NPR.ORG.", &allowed()));
    }

    #[test]
    fn lookalikes_fail() {
        assert!(!host_allowed("evilbbci.co.uk", &allowed()));
        assert!(!host_allowed("bbci.co.uk.evil.com", &allowed()));
        assert!(!host_allowed("evil.example.com", &allowed()));
    }

    #[test]
    fn validation_errors_map_to_4xx() {
        let missing = validate_feed_url(None, &allowed()).unwrap_err();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let garbage = validate_feed_url(Some("::not a url"), &allowed()).unwrap_err();
        assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);

        let ftp = validate_feed_url(Some("ftp://feeds.bbci.co.uk/x"), &allowed()).unwrap_err();
        assert_eq!(ftp.status(), StatusCode::BAD_REQUEST);

        let evil = validate_feed_url(Some("https://evil.example.com/feed"), &allowed()).unwrap_err();
        assert_eq!(evil.status(), StatusCode::FORBIDDEN);

        assert!(validate_feed_url(Some("https://feeds.bbci.co.uk/news/rss.xml"), &allowed()).is_ok());
    }
}
