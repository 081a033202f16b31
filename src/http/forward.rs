//! Binary-safe request forwarding.
//!
//! One routine serves both upstreams: the analytics hosts and the storefront
//! origin. Request bodies are buffered as opaque bytes; response bodies are
//! streamed back untouched together with their `content-encoding` and
//! `content-length`. The client is built with every transparent
//! decompression switched off so the relay never decodes what it carries.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, Response, StatusCode},
    response::IntoResponse,
};

use crate::config::{SecurityConfig, TimeoutConfig};
use crate::observability::metrics;
use crate::security::headers::{apply_cors, apply_forwarded, strip_hop_by_hop, X_FORWARDED_HOST};

/// Which upstream a request is relayed to. Controls header policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardProfile {
    /// Storefront origin: keep `Host`, no CORS.
    Origin,
    /// Primary analytics host.
    IngestPrimary,
    /// Analytics static assets host.
    IngestAssets,
}

impl ForwardProfile {
    pub fn label(self) -> &'static str {
        match self {
            ForwardProfile::Origin => "origin",
            ForwardProfile::IngestPrimary => "ingest",
            ForwardProfile::IngestAssets => "ingest_assets",
        }
    }

    fn is_ingest(self) -> bool {
        !matches!(self, ForwardProfile::Origin)
    }
}

/// Relays requests to upstreams over a shared connection pool.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    max_body_bytes: usize,
    scheme: &'static str,
}

impl Forwarder {
    pub fn new(
        timeouts: &TimeoutConfig,
        security: &SecurityConfig,
        tls: bool,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: security.max_body_size,
            scheme: if tls { "https" } else { "http" },
        })
    }

    /// Forward `request` to `target` (absolute URL including query) and relay
    /// the upstream response. Never fails: upstream problems become 502/504.
    pub async fn forward(
        &self,
        request: Request<Body>,
        target: &str,
        profile: ForwardProfile,
        timeout: Duration,
    ) -> Response<Body> {
        let start = Instant::now();
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let (parts, body) = request.into_parts();

        let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, target = %target, "Request body rejected");
                return error_response(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Request body too large",
                    profile,
                );
            }
        };

        let mut headers = parts.headers;
        self.prepare_request_headers(&mut headers, client_ip, profile);

        let mut upstream = self
            .client
            .request(parts.method.clone(), target)
            .headers(headers)
            .timeout(timeout);
        if !body.is_empty() || !matches!(parts.method, Method::GET | Method::HEAD) {
            upstream = upstream.body(body);
        }

        match upstream.send().await {
            Ok(response) => {
                let status = response.status();
                metrics::record_upstream(profile.label(), status.as_u16(), start);
                tracing::debug!(
                    target = %target,
                    status = %status,
                    upstream = profile.label(),
                    "Upstream responded"
                );

                let mut headers = response.headers().clone();
                strip_hop_by_hop(&mut headers);
                if profile.is_ingest() {
                    apply_cors(&mut headers);
                }

                // Dropping the response body (client went away) drops this
                // stream and with it the upstream connection.
                let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
                *relayed.status_mut() = status;
                *relayed.headers_mut() = headers;
                relayed
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!(target = %target, upstream = profile.label(), "Upstream timed out");
                metrics::record_upstream(profile.label(), 504, start);
                error_response(StatusCode::GATEWAY_TIMEOUT, "Upstream timed out", profile)
            }
            Err(e) => {
                tracing::error!(target = %target, upstream = profile.label(), error = %e, "Upstream error");
                metrics::record_upstream(profile.label(), 502, start);
                error_response(StatusCode::BAD_GATEWAY, "Proxy error", profile)
            }
        }
    }

    fn prepare_request_headers(
        &self,
        headers: &mut HeaderMap,
        client_ip: Option<std::net::IpAddr>,
        profile: ForwardProfile,
    ) {
        strip_hop_by_hop(headers);
        // Recomputed from the buffered body.
        headers.remove(header::CONTENT_LENGTH);

        apply_forwarded(headers, client_ip, self.scheme);

        if profile.is_ingest() {
            // The upstream host is taken from the target URL; site cookies
            // and host identity stay here.
            headers.remove(header::HOST);
            headers.remove(header::COOKIE);
            headers.remove(X_FORWARDED_HOST);
        }
    }
}

fn error_response(
    status: StatusCode,
    message: &'static str,
    profile: ForwardProfile,
) -> Response<Body> {
    let mut response = (status, message).into_response();
    if profile.is_ingest() {
        apply_cors(response.headers_mut());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder() -> Forwarder {
        Forwarder::new(&TimeoutConfig::default(), &SecurityConfig::default(), false).unwrap()
    }

    #[test]
    fn test_ingest_headers_drop_site_identity() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "shop.example.com".parse().unwrap());
        headers.insert(header::COOKIE, "_medusa_cache_id=abc".parse().unwrap());
        headers.insert(header::CONTENT_ENCODING, "gzip".parse().unwrap());
        headers.insert(header::CONTENT_LENGTH, "42".parse().unwrap());

        forwarder().prepare_request_headers(
            &mut headers,
            Some("203.0.113.9".parse().unwrap()),
            ForwardProfile::IngestPrimary,
        );

        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::COOKIE).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get("x-forwarded-host").is_none());
        assert_eq!(headers.get(header::CONTENT_ENCODING).unwrap(), "gzip");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "203.0.113.9");
    }

    #[test]
    fn test_origin_headers_keep_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "shop.example.com".parse().unwrap());
        headers.insert(header::COOKIE, "_medusa_cache_id=abc".parse().unwrap());

        forwarder().prepare_request_headers(&mut headers, None, ForwardProfile::Origin);

        assert_eq!(headers.get(header::HOST).unwrap(), "shop.example.com");
        assert_eq!(headers.get(header::COOKIE).unwrap(), "_medusa_cache_id=abc");
        assert_eq!(headers.get("x-forwarded-host").unwrap(), "shop.example.com");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
    }
}
