// src/news/providers/newsapi.rs
use async_trait::async_trait;
use serde_json::Value;

use super::{keep_displayable, records, send_json, trim_base};
use crate::news::normalize::from_newsapi;
use crate::news::types::{NewsSource, NormalizedArticle, Query, SourceFailure};

/// NewsAPI `/v2/everything`. Primary source; requires `NEWS_API_KEY`.
pub struct NewsApiSource {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl NewsApiSource {
    pub fn new(client: reqwest::Client, base: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
            api_key,
        }
    }

    /// Raw upstream body, used as-is by the simple search endpoint.
    pub async fn search_raw(&self, q: &Query) -> Result<Value, SourceFailure> {
        let key = self.api_key.as_deref().ok_or(SourceFailure::NotConfigured)?;
        let page_size = q.page_size.to_string();
        let page = q.page.to_string();
        let req = self
            .client
            .get(format!("{}/v2/everything", self.base))
            .header("X-Api-Key", key)
            .query(&[
                ("q", q.q.as_str()),
                ("language", q.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("page", page.as_str()),
                ("sortBy", "publishedAt"),
            ]);
        send_json(req).await
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, q: &Query) -> Result<Vec<NormalizedArticle>, SourceFailure> {
        let body = self.search_raw(q).await?;
        if body.get("status").and_then(Value::as_str) == Some("error") {
            let msg = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("status=error");
            return Err(SourceFailure::Decode(msg.to_string()));
        }
        let items = records(&body, "articles")?;
        Ok(keep_displayable(items.iter().map(from_newsapi).collect()))
    }
}
