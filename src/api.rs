// src/api.rs
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::cache::ArticleCache;
use crate::config::{AppConfig, HttpConfig};
use crate::error::ApiError;
use crate::geo::{client_ip, GeoService};
use crate::news::providers::{default_chain, NewsApiSource};
use crate::news::{self, NewsSource, Query as NewsQuery, SourceFailure};
use crate::preferences::{PreferencesStore, UserPreferences};
use crate::prices::{normalize_list, PriceService, DEFAULT_IDS, DEFAULT_VS_CURRENCIES};
use crate::rss_relay::{redirect_policy, RssRelay, FEED_CACHE_CONTROL};
use crate::store::VersionedStore;
use crate::translate::{build_backends, TranslationService, AUTO_SOURCE};

/// Shared state behind every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    sources: Arc<Vec<Box<dyn NewsSource>>>,
    newsapi: Arc<NewsApiSource>,
    prices: Arc<PriceService>,
    geo: Arc<GeoService>,
    rss: Arc<RssRelay>,
    translator: Arc<TranslationService>,
    articles: Arc<ArticleCache>,
    preferences: Arc<PreferencesStore>,
}

/// Shared outbound client. The timeouts are the per-attempt deadline the
/// fallback chain itself does not impose.
pub fn build_http_client(cfg: &HttpConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.timeout())
        .build()
        .context("building reqwest client")
}

/// Client for the RSS relay: same timeouts, redirects restricted to the allow-list.
pub fn build_feed_client(cfg: &HttpConfig, allowed: &[String]) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(cfg.user_agent.clone())
        .connect_timeout(cfg.connect_timeout())
        .timeout(cfg.timeout())
        .redirect(redirect_policy(allowed.to_vec()))
        .build()
        .context("building feed client")
}

impl AppState {
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let client = build_http_client(&config.http)?;
        let feed_client = build_feed_client(&config.http, &config.rss.allowed_domains)?;
        let store = VersionedStore::file(&config.store.dir);
        Ok(Self::with_parts(config, client, store).with_feed_client(feed_client))
    }

    /// Assemble state from an explicit client and persisted store (tests use a
    /// memory store and a client resolving to a mock server). The RSS relay
    /// shares `client` until `with_feed_client` replaces it.
    pub fn with_parts(config: AppConfig, client: reqwest::Client, store: VersionedStore) -> Self {
        let sources = default_chain(&config, &client);
        let newsapi = NewsApiSource::new(
            client.clone(),
            &config.upstreams.newsapi,
            config.keys.newsapi.clone(),
        );
        let prices = PriceService::new(
            client.clone(),
            &config.upstreams.coingecko,
            config.prices.cache_ttl_secs,
        );
        let geo = GeoService::new(client.clone(), &config.upstreams.ipapi);
        let rss = RssRelay::new(client.clone(), config.rss.allowed_domains.clone());
        let translator = TranslationService::new(
            build_backends(&config, &client),
            config.translate.cache_ttl_secs,
        );

        Self {
            sources: Arc::new(sources),
            newsapi: Arc::new(newsapi),
            prices: Arc::new(prices),
            geo: Arc::new(geo),
            rss: Arc::new(rss),
            translator: Arc::new(translator),
            articles: Arc::new(ArticleCache::new(store.clone())),
            preferences: Arc::new(PreferencesStore::new(store)),
            config: Arc::new(config),
        }
    }

    /// Give the RSS relay its own client (see `build_feed_client`).
    pub fn with_feed_client(mut self, client: reqwest::Client) -> Self {
        self.rss = Arc::new(RssRelay::new(
            client,
            self.config.rss.allowed_domains.clone(),
        ));
        self
    }

    /// Replace the resilient-news chain.
    pub fn with_sources(mut self, sources: Vec<Box<dyn NewsSource>>) -> Self {
        self.sources = Arc::new(sources);
        self
    }

    /// Evict stale entries from every cache. Meant for startup, not a timer.
    pub fn sweep_caches(&self) -> usize {
        let articles = self.articles.sweep();
        let translations = self.translator.sweep();
        tracing::info!(articles, translations, "startup cache sweep");
        articles + translations
    }

    pub fn articles(&self) -> &ArticleCache {
        &self.articles
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/prices", get(prices))
        .route("/api/location", get(location))
        .route("/api/news", get(news_simple))
        .route("/api/news/resilient", get(news_resilient))
        .route("/api/articles/{slug}", get(article_by_slug))
        .route("/api/rss", get(rss_proxy))
        .route("/api/translate", get(translate_get).post(translate_post))
        .route("/api/preferences", get(preferences_get).put(preferences_put))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------------- prices ----------------

#[derive(Deserialize)]
struct PriceParams {
    ids: Option<String>,
    vs_currencies: Option<String>,
}

async fn prices(State(state): State<AppState>, Query(p): Query<PriceParams>) -> Response {
    let ids = normalize_list(p.ids.as_deref(), DEFAULT_IDS);
    let vs = normalize_list(p.vs_currencies.as_deref(), DEFAULT_VS_CURRENCIES);
    let (body, origin) = state.prices.lookup(&ids, &vs).await;
    ([("x-data-source", origin.as_str())], Json(body)).into_response()
}

// ---------------- location ----------------

async fn location(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let ip = client_ip(&headers);
    state
        .geo
        .locate(ip.as_deref())
        .await
        .map(Json)
        .map_err(|e| {
            tracing::warn!(target: "geo", error = %format!("{e:#}"), "location lookup failed");
            ApiError::Internal(format!("Failed to fetch location: {e:#}"))
        })
}

// ---------------- news ----------------

/// Raw params; numbers are parsed leniently so junk falls back to defaults.
#[derive(Deserialize)]
struct NewsParams {
    q: Option<String>,
    language: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
    page: Option<String>,
}

impl NewsParams {
    fn to_query(&self) -> NewsQuery {
        let num = |s: &Option<String>| s.as_deref().and_then(|v| v.trim().parse::<u32>().ok());
        NewsQuery::from_params(
            self.q.as_deref(),
            self.language.as_deref(),
            num(&self.page_size),
            num(&self.page),
        )
    }
}

async fn news_simple(
    State(state): State<AppState>,
    Query(p): Query<NewsParams>,
) -> Result<Json<Value>, ApiError> {
    let query = p.to_query();
    match state.newsapi.search_raw(&query).await {
        Ok(body) => Ok(Json(body)),
        Err(SourceFailure::NotConfigured) => {
            Err(ApiError::Internal("News API key not configured".to_string()))
        }
        Err(e) => {
            tracing::warn!(target: "news", error = %e, "simple news search failed");
            Err(ApiError::Internal(format!("Failed to fetch news: {e}")))
        }
    }
}

async fn news_resilient(State(state): State<AppState>, Query(p): Query<NewsParams>) -> Json<Value> {
    let query = p.to_query();
    let out = news::aggregate(&state.sources, &query).await;

    state
        .articles
        .put_many(&out.articles, state.config.news.article_ttl_hours);

    Json(json!({
        "status": "ok",
        "articles": out.articles,
        "source": out.source,
    }))
}

async fn article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<news::NormalizedArticle>, ApiError> {
    state
        .articles
        .get(&slug)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Article not found or expired".to_string()))
}

// ---------------- rss ----------------

#[derive(Deserialize)]
struct RssParams {
    url: Option<String>,
}

async fn rss_proxy(
    State(state): State<AppState>,
    Query(p): Query<RssParams>,
) -> Result<Response, ApiError> {
    let feed = state.rss.fetch(p.url.as_deref()).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, feed.content_type),
            (header::CACHE_CONTROL, FEED_CACHE_CONTROL.to_string()),
        ],
        feed.body,
    )
        .into_response())
}

// ---------------- translate ----------------

#[derive(Deserialize, Default)]
struct TranslateParams {
    text: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

async fn translate_get(State(state): State<AppState>, Query(p): Query<TranslateParams>) -> Response {
    translate(&state, p).await
}

async fn translate_post(
    State(state): State<AppState>,
    body: Result<Json<TranslateParams>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(p)) => translate(&state, p).await,
        Err(rej) => translate_error(StatusCode::BAD_REQUEST, "Invalid JSON body", &rej.body_text()),
    }
}

fn translate_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "success": false,
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

async fn translate(state: &AppState, p: TranslateParams) -> Response {
    let text = p.text.filter(|t| !t.trim().is_empty());
    let target = p
        .target
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty());
    let (Some(text), Some(target)) = (text, target) else {
        return translate_error(
            StatusCode::BAD_REQUEST,
            "Missing required parameters",
            "Both text and target are required",
        );
    };
    let source = p
        .source
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| AUTO_SOURCE.to_string());

    match state.translator.translate(&text, &source, &target).await {
        Ok((t, hit)) => (
            [("x-cache", if hit { "HIT" } else { "MISS" })],
            Json(json!({
                "success": true,
                "translatedText": t.translated_text,
                "detectedLanguage": t.detected_language,
                "source": t.backend,
            })),
        )
            .into_response(),
        Err(e) => translate_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Translation failed",
            &format!("{e:#}"),
        ),
    }
}

// ---------------- preferences ----------------

async fn preferences_get(State(state): State<AppState>) -> Json<UserPreferences> {
    Json(state.preferences.load())
}

async fn preferences_put(
    State(state): State<AppState>,
    body: Result<Json<UserPreferences>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let Json(prefs) = body.map_err(|rej| ApiError::BadRequest(rej.body_text()))?;
    state.preferences.save(&prefs);
    Ok(Json(prefs))
}
