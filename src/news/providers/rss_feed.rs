// src/news/providers/rss_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use super::keep_displayable;
use crate::news::normalize::{from_rss_item, RssItem};
use crate::news::types::{NewsSource, NormalizedArticle, Query, SourceFailure};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/// Last live source of the chain: keyless public RSS feeds.
///
/// Feeds are read one after another and merged in feed order. The query text
/// is not applied; this source exists to always have *something* current.
pub struct RssFeedSource {
    client: reqwest::Client,
    feeds: Vec<String>,
}

impl RssFeedSource {
    pub fn new(client: reqwest::Client, feeds: Vec<String>) -> Self {
        Self { client, feeds }
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<NormalizedArticle>, SourceFailure> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceFailure::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_feed(&body).map_err(|e| SourceFailure::Decode(format!("{e:#}")))
    }
}

/// Parse an RSS 2.0 document into normalized articles.
pub fn parse_feed(xml: &str) -> Result<Vec<NormalizedArticle>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
    let feed_title = rss.channel.title.as_deref().unwrap_or("RSS");
    Ok(rss
        .channel
        .item
        .iter()
        .map(|it| from_rss_item(it, feed_title))
        .collect())
}

#[async_trait]
impl NewsSource for RssFeedSource {
    fn name(&self) -> &'static str {
        "rss"
    }

    fn is_configured(&self) -> bool {
        !self.feeds.is_empty()
    }

    async fn fetch(&self, q: &Query) -> Result<Vec<NormalizedArticle>, SourceFailure> {
        let mut merged = Vec::new();
        let mut last_err = None;
        for feed in &self.feeds {
            match self.fetch_feed(feed).await {
                Ok(mut v) => merged.append(&mut v),
                Err(e) => {
                    tracing::debug!(target: "news", feed = %feed, error = %e, "rss feed failed");
                    last_err = Some(e);
                }
            }
        }

        let merged = keep_displayable(merged);
        if merged.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        Ok(merged
            .into_iter()
            .skip(q.offset() as usize)
            .take(q.page_size as usize)
            .collect())
    }
}

/// HTML entities that are not valid XML but show up in real feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
