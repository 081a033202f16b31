//! Analytics ingest proxy.
//!
//! # Data Flow
//! ```text
//! /ph/<sub>  or  /<cc>/ph/<sub>
//!     → OPTIONS? answered locally (preflight)
//!     → target.rs (static|array → assets host, else collection host)
//!     → http::forward (bytes in, bytes out, CORS attached)
//! ```
//!
//! Relaying through the site's own origin keeps client-side blockers from
//! dropping analytics traffic.

pub mod target;

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::forward::Forwarder;
use crate::observability::metrics;
use crate::security::headers::apply_cors;

pub use target::{AnalyticsRegion, IngestHosts, IngestTarget};

/// Preflight cache lifetime handed to browsers.
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Relay one ingest request. `sub_path` is the path below the ingest prefix.
pub async fn handle_ingest(
    hosts: &IngestHosts,
    forwarder: &Forwarder,
    request: Request<Body>,
    sub_path: &str,
    answer_preflight: bool,
    timeout: Duration,
) -> Response {
    let start = Instant::now();

    if answer_preflight && request.method() == Method::OPTIONS {
        metrics::record_request("ingest_preflight", 200, start);
        return preflight_response();
    }

    let target = hosts.target(sub_path, request.uri().query());
    tracing::debug!(
        method = %request.method(),
        target = %target.url,
        upstream = target.profile.label(),
        "Relaying analytics request"
    );

    let response = forwarder
        .forward(request, &target.url, target.profile, timeout)
        .await;
    metrics::record_request("ingest", response.status().as_u16(), start);
    response
}

fn preflight_response() -> Response {
    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    apply_cors(headers);
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(PREFLIGHT_MAX_AGE));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyticsConfig, SecurityConfig, TimeoutConfig};

    #[tokio::test]
    async fn test_preflight_answered_without_upstream() {
        let hosts = IngestHosts::from_config(&AnalyticsConfig {
            // Nothing listens here; a forwarded request would fail.
            host: "http://127.0.0.1:9".to_string(),
            ..AnalyticsConfig::default()
        })
        .unwrap();
        let forwarder =
            Forwarder::new(&TimeoutConfig::default(), &SecurityConfig::default(), false).unwrap();

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/ph/e/")
            .body(Body::empty())
            .unwrap();

        let response =
            handle_ingest(&hosts, &forwarder, request, "e/", true, Duration::from_secs(1)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
