// tests/common/mod.rs
//
// Shared helpers: a config pointing every upstream at one mock server, a
// memory-backed store, and small request/response utilities.
#![allow(dead_code)]

use atlasiq_proxy::config::AppConfig;
use atlasiq_proxy::store::VersionedStore;
use atlasiq_proxy::{router, AppState};
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt as _; // for `oneshot`

pub const BODY_LIMIT: usize = 1024 * 1024;

/// Every upstream base URL set to `base`, no RSS feeds, no keys.
pub fn mock_config(base: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    let up = &mut cfg.upstreams;
    up.newsapi = base.to_string();
    up.newsdata = base.to_string();
    up.worldnews = base.to_string();
    up.coingecko = base.to_string();
    up.ipapi = base.to_string();
    up.google_translate = base.to_string();
    up.mymemory = base.to_string();
    up.lingva = base.to_string();
    up.libretranslate = base.to_string();
    cfg.news.rss_feeds.clear();
    cfg
}

pub fn state_with(cfg: AppConfig, client: reqwest::Client) -> AppState {
    AppState::with_parts(cfg, client, VersionedStore::memory())
}

pub fn app_for(base: &str) -> Router {
    router(state_with(mock_config(base), reqwest::Client::new()))
}

pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.expect("router response")
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    send(app, req).await
}

pub async fn post_json(app: &Router, uri: &str, payload: &Value) -> Response {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    send(app, req).await
}

pub async fn body_bytes(resp: Response) -> Vec<u8> {
    body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec()
}

pub async fn json_of(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = body_bytes(resp).await;
    let v = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

pub fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}
