// src/news/providers/newsdata.rs
use async_trait::async_trait;

use super::{keep_displayable, records, send_json, trim_base};
use crate::news::normalize::from_newsdata;
use crate::news::types::{NewsSource, NormalizedArticle, Query, SourceFailure};

/// NewsData.io `/api/1/news`; requires `NEWSDATA_API_KEY`.
/// Pagination is cursor based upstream, so only the first page is requested.
pub struct NewsDataSource {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

const MAX_SIZE: u32 = 50;

impl NewsDataSource {
    pub fn new(client: reqwest::Client, base: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base: trim_base(base),
            api_key,
        }
    }
}

#[async_trait]
impl NewsSource for NewsDataSource {
    fn name(&self) -> &'static str {
        "newsdata"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, q: &Query) -> Result<Vec<NormalizedArticle>, SourceFailure> {
        let key = self.api_key.as_deref().ok_or(SourceFailure::NotConfigured)?;
        let size = q.page_size.min(MAX_SIZE).to_string();
        let req = self
            .client
            .get(format!("{}/api/1/news", self.base))
            .query(&[
                ("apikey", key),
                ("q", q.q.as_str()),
                ("language", q.language.as_str()),
                ("size", size.as_str()),
            ]);
        let body = send_json(req).await?;
        let items = records(&body, "results")?;
        Ok(keep_displayable(items.iter().map(from_newsdata).collect()))
    }
}
