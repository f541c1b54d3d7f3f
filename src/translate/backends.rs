// src/translate/backends.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Translation, Translator};

fn base(raw: &str) -> String {
    raw.trim_end_matches('/').to_string()
}

async fn json_or_status(resp: reqwest::Response, who: &str) -> Result<Value> {
    let status = resp.status();
    if !status.is_success() {
        bail!("{who} returned HTTP {}", status.as_u16());
    }
    resp.json::<Value>()
        .await
        .with_context(|| format!("{who} body"))
}

/// Google's keyless `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: reqwest::Client,
    base: String,
}

impl GoogleTranslator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base: base(base_url),
        }
    }
}

/// Body shape: `[[["<translated>", "<original>", ...], ...], null, "<detected>", ...]`.
pub fn parse_google_body(body: &Value) -> Result<(String, Option<String>)> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("google: missing segment array"))?;
    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        bail!("google: empty translation");
    }
    let detected = body.get(2).and_then(Value::as_str).map(str::to_string);
    Ok((text, detected))
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation> {
        let resp = self
            .client
            .get(format!("{}/translate_a/single", self.base))
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .context("google request")?;
        let body = json_or_status(resp, "google").await?;
        let (translated, detected) = parse_google_body(&body)?;
        Ok(Translation {
            translated_text: translated,
            detected_language: detected.unwrap_or_else(|| source.to_string()),
            backend: self.name(),
        })
    }
}

/// MyMemory `/get`.
pub struct MyMemoryTranslator {
    client: reqwest::Client,
    base: String,
}

impl MyMemoryTranslator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base: base(base_url),
        }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    fn name(&self) -> &'static str {
        "mymemory"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation> {
        let src = if source == "auto" { "autodetect" } else { source };
        let langpair = format!("{src}|{target}");
        let resp = self
            .client
            .get(format!("{}/get", self.base))
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .context("mymemory request")?;
        let body = json_or_status(resp, "mymemory").await?;

        // responseStatus arrives as a number or a string depending on the path taken upstream.
        let status_ok = match body.get("responseStatus") {
            Some(Value::Number(n)) => n.as_u64() == Some(200),
            Some(Value::String(s)) => s == "200",
            _ => false,
        };
        if !status_ok {
            bail!("mymemory: {}", body.get("responseDetails").cloned().unwrap_or(Value::Null));
        }
        let data = body.get("responseData").cloned().unwrap_or(Value::Null);
        let translated = data
            .get("translatedText")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("mymemory: empty translation"))?;
        let detected = data
            .get("detectedLanguage")
            .and_then(Value::as_str)
            .unwrap_or(source);
        Ok(Translation {
            translated_text: translated.to_string(),
            detected_language: detected.to_string(),
            backend: self.name(),
        })
    }
}

/// Lingva `/api/v1/{source}/{target}/{text}`.
pub struct LingvaTranslator {
    client: reqwest::Client,
    base: String,
}

impl LingvaTranslator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base: base(base_url),
        }
    }
}

#[async_trait]
impl Translator for LingvaTranslator {
    fn name(&self) -> &'static str {
        "lingva"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation> {
        let mut url = url::Url::parse(&self.base).context("lingva base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("lingva base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["api", "v1", source, target, text]);

        let resp = self.client.get(url).send().await.context("lingva request")?;
        let body = json_or_status(resp, "lingva").await?;
        let translated = body
            .get("translation")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("lingva: empty translation"))?;
        let detected = body
            .pointer("/info/detectedSource")
            .and_then(Value::as_str)
            .unwrap_or(source);
        Ok(Translation {
            translated_text: translated.to_string(),
            detected_language: detected.to_string(),
            backend: self.name(),
        })
    }
}

/// LibreTranslate `POST /translate`.
pub struct LibreTranslator {
    client: reqwest::Client,
    base: String,
}

impl LibreTranslator {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base: base(base_url),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    fn name(&self) -> &'static str {
        "libretranslate"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation> {
        let resp = self
            .client
            .post(format!("{}/translate", self.base))
            .json(&json!({
                "q": text,
                "source": source,
                "target": target,
                "format": "text",
            }))
            .send()
            .await
            .context("libretranslate request")?;
        let body = json_or_status(resp, "libretranslate").await?;
        let translated = body
            .get("translatedText")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("libretranslate: empty translation"))?;
        let detected = body
            .pointer("/detectedLanguage/language")
            .and_then(Value::as_str)
            .unwrap_or(source);
        Ok(Translation {
            translated_text: translated.to_string(),
            detected_language: detected.to_string(),
            backend: self.name(),
        })
    }
}
