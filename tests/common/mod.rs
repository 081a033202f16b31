//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{Request, Response},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storefront_edge::config::EdgeConfig;
use storefront_edge::http::EdgeServer;

/// Host the test client pretends to address.
pub const EDGE_HOST: &str = "localhost:8000";

/// Address nothing listens on.
pub const DEAD_UPSTREAM: &str = "http://127.0.0.1:9";

/// Config pointing every upstream at the given URLs.
pub fn edge_config(backend: Option<&str>, origin: &str, analytics: &str) -> EdgeConfig {
    let mut config = EdgeConfig::default();
    config.regions.backend_url = backend.map(str::to_string);
    config.regions.default_country = "us".to_string();
    config.site.origin_url = origin.to_string();
    config.analytics.host = analytics.to_string();
    config
}

pub fn region(id: &str, currency: &str, countries: &[&str]) -> Value {
    json!({
        "id": id,
        "name": id,
        "currency_code": currency,
        "countries": countries.iter().map(|c| json!({ "iso_2": c })).collect::<Vec<_>>(),
    })
}

/// Region backend answering with `regions`, expected to be hit `expected` times.
pub async fn regions_backend(regions: Vec<Value>, expected: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/store/regions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "regions": regions })))
        .expect(expected)
        .mount(&server)
        .await;
    server
}

/// The usual two-region store: us → USD, dk/se → EUR.
pub async fn default_backend(expected: u64) -> MockServer {
    regions_backend(
        vec![region("reg_us", "usd", &["us"]), region("reg_eu", "eur", &["dk", "se"])],
        expected,
    )
    .await
}

/// Storefront renderer that answers every path.
pub async fn storefront_origin() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_string("storefront page"))
        .mount(&server)
        .await;
    server
}

pub fn edge_router(config: EdgeConfig) -> Router {
    EdgeServer::new(config).unwrap().router()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("host", EDGE_HOST)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()["location"].to_str().unwrap()
}
