// src/news/providers/mod.rs
pub mod newsapi;
pub mod newsdata;
pub mod rss_feed;
pub mod worldnews;

use serde_json::Value;

use crate::config::AppConfig;
use crate::news::types::{NewsSource, NormalizedArticle, SourceFailure};

pub use newsapi::NewsApiSource;
pub use newsdata::NewsDataSource;
pub use rss_feed::RssFeedSource;
pub use worldnews::WorldNewsSource;

/// Built-in chain, highest priority first.
pub fn default_chain(cfg: &AppConfig, client: &reqwest::Client) -> Vec<Box<dyn NewsSource>> {
    vec![
        Box::new(NewsApiSource::new(
            client.clone(),
            &cfg.upstreams.newsapi,
            cfg.keys.newsapi.clone(),
        )),
        Box::new(NewsDataSource::new(
            client.clone(),
            &cfg.upstreams.newsdata,
            cfg.keys.newsdata.clone(),
        )),
        Box::new(WorldNewsSource::new(
            client.clone(),
            &cfg.upstreams.worldnews,
            cfg.keys.worldnews.clone(),
        )),
        Box::new(RssFeedSource::new(client.clone(), cfg.news.rss_feeds.clone())),
    ]
}

/// Send a prepared request and decode a 2xx JSON body.
pub(crate) async fn send_json(req: reqwest::RequestBuilder) -> Result<Value, SourceFailure> {
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceFailure::Status(status.as_u16()));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| SourceFailure::Decode(e.to_string()))
}

/// Records array at `key`, or a decode failure naming the missing field.
pub(crate) fn records<'a>(body: &'a Value, key: &str) -> Result<&'a Vec<Value>, SourceFailure> {
    body.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceFailure::Decode(format!("missing `{key}` array")))
}

/// Drop records the dashboard cannot link to or title.
pub(crate) fn keep_displayable(articles: Vec<NormalizedArticle>) -> Vec<NormalizedArticle> {
    articles
        .into_iter()
        .filter(|a| !a.title.is_empty() && !a.url.is_empty() && a.title != "[Removed]")
        .collect()
}

pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
