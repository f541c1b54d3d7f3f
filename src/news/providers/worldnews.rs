// src/news/providers/worldnews.rs
use async_trait::async_trait;

use super::{keep_displayable, records, send_json, trim_base};
use crate::news::normalize::from_worldnews;
use crate::news::types::{NewsSource, NormalizedArticle, Query, SourceFailure};

/// World News API `/search-news`; requires `WORLDNEWS_API_KEY`.
pub struct WorldNewsSource {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl WorldNewsSource {
    pub fn new(client: reqwest::Client, base: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
            api_key,
        }
    }
}

#[async_trait]
impl NewsSource for WorldNewsSource {
    fn name(&self) -> &'static str {
        "worldnews"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, q: &Query) -> Result<Vec<NormalizedArticle>, SourceFailure> {
        let key = self.api_key.as_deref().ok_or(SourceFailure::NotConfigured)?;
        let number = q.page_size.to_string();
        let offset = q.offset().to_string();
        let req = self
            .client
            .get(format!("{}/search-news", self.base))
            .header("x-api-key", key)
            .query(&[
                ("text", q.q.as_str()),
                ("language", q.language.as_str()),
                ("number", number.as_str()),
                ("offset", offset.as_str()),
            ]);
        let body = send_json(req).await?;
        let items = records(&body, "news")?;
        Ok(keep_displayable(items.iter().map(from_worldnews).collect()))
    }
}
