// tests/rss_relay.rs
//
// RSS relay: allow-list enforcement (including redirects) and body/content-type
// passthrough.
// Allowed hosts are resolved to the local mock server via reqwest's DNS
// override, so the real publisher hostname is exercised end to end.

mod common;

use axum::http::StatusCode;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_for, body_bytes, encode, get, json_of, mock_config, state_with};

const FEED: &str = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>BBC News</title><item><title>Hello</title><link>https://www.bbc.co.uk/news/1</link></item></channel></rss>"#;

#[tokio::test]
async fn disallowed_domain_is_403_with_allow_list() {
    let server = MockServer::start().await;
    let app = app_for(&server.uri());

    let uri = format!("/api/rss?url={}", encode("https://evil.example.com/feed"));
    let (status, v) = json_of(get(&app, &uri).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(v["error"], "Domain not allowed");
    let allowed = v["allowed"].as_array().expect("allow-list enumerated");
    assert!(allowed.iter().any(|d| d == "bbci.co.uk"));
}

#[tokio::test]
async fn missing_url_is_400() {
    let server = MockServer::start().await;
    let app = app_for(&server.uri());
    let (status, v) = json_of(get(&app, "/api/rss").await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn allowed_feed_is_passed_through_with_cache_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/rss.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml; charset=utf-8")
                .set_body_string(FEED),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = reqwest::Client::builder()
        .resolve("feeds.bbci.co.uk", *server.address())
        .build()
        .unwrap();
    let app = atlasiq_proxy::router(state_with(mock_config(&server.uri()), client));
    let port = server.address().port();

    let feed_url = format!("http://feeds.bbci.co.uk:{port}/news/rss.xml");
    let resp = get(&app, &format!("/api/rss?url={}", encode(&feed_url))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/rss+xml; charset=utf-8");
    assert_eq!(
        resp.headers()["cache-control"],
        "s-maxage=300, stale-while-revalidate=600"
    );
    let body = String::from_utf8(body_bytes(resp).await).unwrap();
    assert_eq!(body, FEED);

    // Upstream status is passed through.
    let gone = format!("http://feeds.bbci.co.uk:{port}/news/gone.xml");
    let (status, v) = json_of(get(&app, &format!("/api/rss?url={}", encode(&gone))).await).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn redirects_are_followed_only_within_the_allow_list() {
    let server = MockServer::start().await;
    let port = server.address().port();
    Mock::given(method("GET"))
        .and(path("/news/rss.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(FEED),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/old.xml"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("http://feeds.bbci.co.uk:{port}/news/rss.xml").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/moved.xml"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://evil.example.com:{port}/feed").as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not for you"))
        .expect(0)
        .mount(&server)
        .await;

    let cfg = mock_config(&server.uri());
    let client = reqwest::Client::builder()
        .resolve("feeds.bbci.co.uk", *server.address())
        .resolve("evil.example.com", *server.address())
        .redirect(atlasiq_proxy::rss_relay::redirect_policy(cfg.rss.allowed_domains.clone()))
        .build()
        .unwrap();
    let app = atlasiq_proxy::router(state_with(cfg, client));

    let within = format!("http://feeds.bbci.co.uk:{port}/news/old.xml");
    let resp = get(&app, &format!("/api/rss?url={}", encode(&within))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(String::from_utf8(body_bytes(resp).await).unwrap(), FEED);

    let off_list = format!("http://feeds.bbci.co.uk:{port}/news/moved.xml");
    let (status, v) = json_of(get(&app, &format!("/api/rss?url={}", encode(&off_list))).await).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(v["error"], "Domain not allowed");
}
