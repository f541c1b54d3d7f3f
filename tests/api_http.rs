// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// Upstreams are served by wiremock; the router is driven via oneshot.
//
// Covered:
// - GET /health
// - CORS pre-flight and method rejection
// - GET /api/prices (live, cached, fallback)
// - GET /api/location (forwarded-for, non-IP header values, upstream failure)
// - GET/PUT /api/preferences

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_for, body_bytes, get, json_of, send};

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let server = MockServer::start().await;
    let app = app_for(&server.uri());

    let resp = get(&app, "/health").await;
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");
    let body = String::from_utf8(body_bytes(resp).await).expect("utf8");
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn preflight_is_answered_and_other_methods_rejected() {
    let server = MockServer::start().await;
    let app = app_for(&server.uri());

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/news/resilient")
        .header("origin", "https://dashboard.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, preflight).await;
    assert!(resp.status().is_success(), "pre-flight got {}", resp.status());
    assert!(resp.headers().contains_key("access-control-allow-origin"));

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/prices")
        .body(Body::empty())
        .unwrap();
    let resp = send(&app, delete).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn prices_pass_through_then_come_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .and(query_param("ids", "bitcoin,solana"))
        .and(query_param("vs_currencies", "eur"))
        .and(query_param("include_24hr_change", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": { "eur": 60000.5, "eur_24h_change": -1.2 },
            "solana": { "eur": 140.0, "eur_24h_change": 3.4 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server.uri());

    let resp = get(&app, "/api/prices?ids=Bitcoin,%20solana&vs_currencies=EUR").await;
    assert_eq!(resp.headers()["x-data-source"], "coingecko");
    let (status, v) = json_of(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["solana"]["eur"], json!(140.0));

    let resp = get(&app, "/api/prices?ids=bitcoin,solana&vs_currencies=eur").await;
    assert_eq!(resp.headers()["x-data-source"], "cache");
    let (_, again) = json_of(resp).await;
    assert_eq!(again, v);
}

#[tokio::test]
async fn prices_upstream_error_yields_200_fallback_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/simple/price"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let app = app_for(&server.uri());
    let resp = get(&app, "/api/prices").await;
    assert_eq!(resp.headers()["x-data-source"], "fallback");
    let (status, v) = json_of(resp).await;
    assert_eq!(status, StatusCode::OK, "fallback must never be an error status");
    assert_eq!(v, atlasiq_proxy::prices::fallback_prices());
}

#[tokio::test]
async fn location_uses_first_forwarded_hop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/203.0.113.9/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "203.0.113.9",
            "city": "Lisbon",
            "country_code": "PT",
            "latitude": 38.72,
            "longitude": -9.14
        })))
        .mount(&server)
        .await;

    let app = app_for(&server.uri());
    let req = Request::builder()
        .uri("/api/location")
        .header("x-forwarded-for", "203.0.113.9, 10.0.0.2")
        .body(Body::empty())
        .unwrap();
    let (status, v) = json_of(send(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["city"], "Lisbon");
}

#[tokio::test]
async fn location_failure_is_500_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/127.0.0.1/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "127.0.0.1", "error": true, "reason": "Reserved IP Address"
        })))
        .mount(&server)
        .await;

    let app = app_for(&server.uri());

    let (status, v) = json_of(get(&app, "/api/location").await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap().contains("503"));

    let req = Request::builder()
        .uri("/api/location")
        .header("x-real-ip", "127.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, v) = json_of(send(&app, req).await).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(v["error"].as_str().unwrap().contains("Reserved IP Address"));
}

#[tokio::test]
async fn location_ignores_forwarded_values_that_are_not_ips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "city": "Origin" })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server.uri());
    let req = Request::builder()
        .uri("/api/location")
        .header("x-forwarded-for", "1.1.1.1/../x?")
        .body(Body::empty())
        .unwrap();
    let (status, v) = json_of(send(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["city"], "Origin");
}

#[tokio::test]
async fn preferences_default_then_round_trip() {
    let server = MockServer::start().await;
    let app = app_for(&server.uri());

    let (status, v) = json_of(get(&app, "/api/preferences").await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["currency"], "usd");

    let put = Request::builder()
        .method("PUT")
        .uri("/api/preferences")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "language": "pt", "currency": "eur", "categories": ["science"] }).to_string(),
        ))
        .unwrap();
    let (status, _) = json_of(send(&app, put).await).await;
    assert_eq!(status, StatusCode::OK);

    let (_, v) = json_of(get(&app, "/api/preferences").await).await;
    assert_eq!(v["language"], "pt");
    assert_eq!(v["categories"], json!(["science"]));
    assert!(v["location"].is_null());

    let bad = Request::builder()
        .method("PUT")
        .uri("/api/preferences")
        .header("content-type", "application/json")
        .body(Body::from("{nope"))
        .unwrap();
    let resp = send(&app, bad).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
