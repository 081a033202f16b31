//! Request helpers.
//!
//! # Responsibilities
//! - Attach and propagate a unique `x-request-id` (UUID v4)
//! - Reconstruct the public origin a client used, for redirect locations
//! - Rebuild the origin URL for pass-through requests

use axum::http::{header, HeaderMap, Uri};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::security::headers::{X_FORWARDED_HOST, X_FORWARDED_PROTO};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Layer that assigns a request id when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that copies the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Scheme and authority the client addressed, e.g. `https://shop.example.com`.
///
/// A configured public origin wins. Otherwise `X-Forwarded-Proto` and
/// `X-Forwarded-Host` (first value each) are preferred over the listener
/// scheme and `Host`.
pub fn request_origin(headers: &HeaderMap, public_origin: Option<&str>, tls: bool) -> String {
    if let Some(origin) = public_origin.filter(|o| !o.is_empty()) {
        return origin.trim_end_matches('/').to_string();
    }

    let first = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let default_scheme = if tls { "https" } else { "http" };
    let scheme = first(X_FORWARDED_PROTO).unwrap_or_else(|| default_scheme.to_string());
    let host = first(X_FORWARDED_HOST)
        .or_else(|| first(header::HOST.as_str()))
        .unwrap_or_else(|| "localhost".to_string());

    format!("{scheme}://{host}")
}

/// Absolute URL on the storefront origin for a request URI.
pub fn origin_target(origin_url: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", origin_url.trim_end_matches('/'), path_and_query)
}
