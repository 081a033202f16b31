//! Analytics relay behaviour through the full edge router.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use wiremock::matchers::{body_bytes as body_exact, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::*;

/// Starts like a gzip stream, includes bytes that are not valid UTF-8.
const GZIP_LIKE: &[u8] = &[0x1f, 0x8b, 0x08, 0x00, 0xff, 0xfe, 0x00, 0x10, 0x80, 0xc3, 0x28];

async fn analytics_upstream() -> MockServer {
    MockServer::start().await
}

#[tokio::test]
async fn test_binary_capture_body_relayed_byte_exact() {
    let backend = default_backend(0).await;
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .and(path("/e/"))
        .and(query_param("compression", "gzip-js"))
        .and(body_exact(GZIP_LIKE.to_vec()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(GZIP_LIKE.to_vec()),
        )
        .expect(1)
        .mount(&posthog)
        .await;
    let router = edge_router(edge_config(Some(&backend.uri()), DEAD_UPSTREAM, &posthog.uri()));

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/?compression=gzip-js&ver=1.0")
        .header("host", EDGE_HOST)
        .header("content-type", "text/plain")
        .body(Body::from(GZIP_LIKE))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-encoding"], "gzip");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["access-control-allow-methods"], "GET, POST, OPTIONS");
    assert_eq!(body_bytes(response).await.as_ref(), GZIP_LIKE);
}

#[tokio::test]
async fn test_static_assets_go_to_assets_host() {
    let primary = analytics_upstream().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&primary)
        .await;
    let assets = analytics_upstream().await;
    Mock::given(method("GET"))
        .and(path("/static/array.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/* posthog */"))
        .expect(1)
        .mount(&assets)
        .await;

    let mut config = edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &primary.uri());
    config.analytics.assets_host = Some(assets.uri());
    let router = edge_router(config);

    let response = send(&router, get("/ph/static/array.js")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), b"/* posthog */");
}

#[tokio::test]
async fn test_country_prefixed_ingest_path() {
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .and(path("/decide/"))
        .and(query_param("v", "3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "featureFlags": {} })),
        )
        .expect(1)
        .mount(&posthog)
        .await;
    let router = edge_router(edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri()));

    let request = Request::builder()
        .method("POST")
        .uri("/dk/ph/decide/?v=3")
        .header("host", EDGE_HOST)
        .body(Body::from("{}"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_site_cookies_not_sent_upstream() {
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&posthog)
        .await;
    let router = edge_router(edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri()));

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .header("cookie", "_medusa_cache_id=abc; session=secret")
        .header("user-agent", "edge-test")
        .body(Body::from("data"))
        .unwrap();
    send(&router, request).await;

    let received = posthog.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("cookie").is_none());
    assert_eq!(received[0].headers.get("user-agent").unwrap(), "edge-test");
}

#[tokio::test]
async fn test_upstream_status_and_headers_pass_through() {
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .and(header("content-type", "application/json"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("x-posthog-trace", "t-1")
                .set_body_string("invalid payload"),
        )
        .mount(&posthog)
        .await;
    let router = edge_router(edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri()));

    let request = Request::builder()
        .method("POST")
        .uri("/ingest/capture")
        .header("host", EDGE_HOST)
        .header("content-type", "application/json")
        .body(Body::from("{"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-posthog-trace"], "t-1");
    assert_eq!(body_bytes(response).await.as_ref(), b"invalid payload");
}

#[tokio::test]
async fn test_preflight_answered_locally() {
    let posthog = analytics_upstream().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&posthog)
        .await;
    let router = edge_router(edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri()));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .header("origin", "https://shop.example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["access-control-allow-headers"], "*");
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    let router = edge_router(edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, DEAD_UPSTREAM));

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .body(Body::from("x"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_bytes(response).await.as_ref(), b"Proxy error");
}

#[tokio::test]
async fn test_slow_upstream_is_504() {
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&posthog)
        .await;
    let mut config = edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri());
    config.analytics.timeout_secs = 1;
    let router = edge_router(config);

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .body(Body::from("x"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body_bytes(response).await.as_ref(), b"Upstream timed out");
}

#[tokio::test]
async fn test_ingest_deadline_outlives_request_timeout() {
    let posthog = analytics_upstream().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&posthog)
        .await;
    let mut config = edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri());
    config.timeouts.request_secs = 1;
    config.analytics.timeout_secs = 2;
    let router = edge_router(config);

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .body(Body::from("x"))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let posthog = analytics_upstream().await;
    let mut config = edge_config(Some(DEAD_UPSTREAM), DEAD_UPSTREAM, &posthog.uri());
    config.security.max_body_size = 16;
    let router = edge_router(config);

    let request = Request::builder()
        .method("POST")
        .uri("/ph/e/")
        .header("host", EDGE_HOST)
        .body(Body::from(vec![0u8; 64]))
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(posthog.received_requests().await.unwrap().is_empty());
}
