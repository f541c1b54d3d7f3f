// src/news/normalize.rs
//! Upstream record → `NormalizedArticle` mappers.
//!
//! One function per upstream. Each takes a single raw record and never fails:
//! missing or mistyped fields become an empty string or `None`.

use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::news::types::{ArticleSource, NormalizedArticle};

/// Character budget for descriptions cut from full body text.
pub const DESCRIPTION_BUDGET: usize = 200;
pub const ELLIPSIS: &str = "...";

/// Non-empty, trimmed string field.
fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-empty string of a field that may be a string or an array of strings.
fn first_str(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

/// Cut `s` to `budget` characters and mark the cut with an ellipsis.
pub fn truncate_with_ellipsis(s: &str, budget: usize) -> String {
    if s.chars().count() <= budget {
        return s.to_string();
    }
    let head: String = s.chars().take(budget).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// NewsAPI records already use the canonical field names, so this is a
/// field-for-field passthrough. Feeding a serialized `NormalizedArticle` back
/// in returns an equal article.
pub fn from_newsapi(v: &Value) -> NormalizedArticle {
    NormalizedArticle {
        title: str_field(v, "title").unwrap_or_default(),
        description: str_field(v, "description").unwrap_or_default(),
        url: str_field(v, "url").unwrap_or_default(),
        url_to_image: str_field(v, "urlToImage"),
        published_at: str_field(v, "publishedAt").unwrap_or_default(),
        author: str_field(v, "author"),
        source: ArticleSource {
            name: v
                .get("source")
                .and_then(|s| str_field(s, "name"))
                .unwrap_or_default(),
        },
    }
}

pub fn from_newsdata(v: &Value) -> NormalizedArticle {
    let description = str_field(v, "description")
        .map(|d| clean_text(&d))
        .filter(|d| !d.is_empty())
        .or_else(|| {
            str_field(v, "content")
                .map(|c| truncate_with_ellipsis(&clean_text(&c), DESCRIPTION_BUDGET))
        })
        .unwrap_or_default();

    NormalizedArticle {
        title: str_field(v, "title").map(|t| clean_text(&t)).unwrap_or_default(),
        description,
        url: str_field(v, "link").unwrap_or_default(),
        url_to_image: str_field(v, "image_url"),
        published_at: str_field(v, "pubDate")
            .map(|d| sql_datetime_to_rfc3339(&d))
            .unwrap_or_default(),
        author: first_str(v, "creator"),
        source: ArticleSource {
            name: str_field(v, "source_name")
                .or_else(|| str_field(v, "source_id"))
                .unwrap_or_else(|| "NewsData".to_string()),
        },
    }
}

pub fn from_worldnews(v: &Value) -> NormalizedArticle {
    let description = str_field(v, "summary")
        .map(|s| clean_text(&s))
        .or_else(|| {
            str_field(v, "text")
                .map(|t| truncate_with_ellipsis(&clean_text(&t), DESCRIPTION_BUDGET))
        })
        .unwrap_or_default();
    let url = str_field(v, "url").unwrap_or_default();

    NormalizedArticle {
        title: str_field(v, "title").map(|t| clean_text(&t)).unwrap_or_default(),
        description,
        url_to_image: str_field(v, "image"),
        published_at: str_field(v, "publish_date")
            .map(|d| sql_datetime_to_rfc3339(&d))
            .unwrap_or_default(),
        author: str_field(v, "author").or_else(|| first_str(v, "authors")),
        source: ArticleSource {
            name: host_label(&url).unwrap_or_else(|| "WorldNews".to_string()),
        },
        url,
    }
}

/// One `<item>` of an RSS 2.0 channel.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub author: Option<String>,
    /// `<dc:creator>`; quick-xml matches namespaced elements by local name.
    #[serde(rename = "creator")]
    pub creator: Option<String>,
    pub enclosure: Option<RssEnclosure>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RssEnclosure {
    #[serde(rename = "@url")]
    pub url: Option<String>,
    #[serde(rename = "@type")]
    pub kind: Option<String>,
}

pub fn from_rss_item(item: &RssItem, feed_title: &str) -> NormalizedArticle {
    let non_empty = |s: &Option<String>| {
        s.as_deref()
            .map(clean_text)
            .filter(|s| !s.is_empty())
    };

    let image = item.enclosure.as_ref().and_then(|e| {
        let is_image = e
            .kind
            .as_deref()
            .map(|k| k.starts_with("image/"))
            .unwrap_or(true);
        e.url.clone().filter(|_| is_image)
    });

    NormalizedArticle {
        title: non_empty(&item.title).unwrap_or_default(),
        description: non_empty(&item.description)
            .map(|d| truncate_with_ellipsis(&d, DESCRIPTION_BUDGET))
            .unwrap_or_default(),
        url: item.link.as_deref().map(str::trim).unwrap_or_default().to_string(),
        url_to_image: image,
        published_at: item
            .pub_date
            .as_deref()
            .map(rfc2822_to_rfc3339)
            .unwrap_or_default(),
        author: non_empty(&item.creator).or_else(|| non_empty(&item.author)),
        source: ArticleSource {
            name: feed_title.trim().to_string(),
        },
    }
}

/// RFC 2822 (`Tue, 10 Jun 2025 14:00:00 GMT`) → RFC 3339; unparsable input is kept as-is.
fn rfc2822_to_rfc3339(ts: &str) -> String {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| ts.trim().to_string())
}

/// `2025-06-10 14:00:00` (UTC, as NewsData and WorldNews send it) → RFC 3339.
fn sql_datetime_to_rfc3339(ts: &str) -> String {
    NaiveDateTime::parse_from_str(ts.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|_| ts.trim().to_string())
}

fn host_label(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}
