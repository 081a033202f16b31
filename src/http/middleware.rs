//! Edge middleware: the request dispatcher.
//!
//! # Data Flow
//! ```text
//! request
//!     → ingest prefix?  → ingest::handle_ingest (never reaches the origin handler)
//!     → bypass path?    → origin handler
//!     → region lookup   → country code → decide()
//!         PassThrough   → origin handler
//!         SetCacheId    → 307 same URL + Set-Cookie
//!         Redirect      → 307 country-prefixed URL
//!         NoRegions     → 500
//! ```

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::{request_id, request_origin};
use crate::http::server::{AppState, EdgeState};
use crate::ingest::handle_ingest;
use crate::observability::metrics;
use crate::regions::{geo_country, resolve_country_code, RegionLookup};
use crate::routing::{
    cache_id_set_cookie, decide, new_cache_id, read_cache_id, Dispatch, PathMatcher, RequestView,
};

pub const NO_REGIONS_MESSAGE: &str =
    "No valid regions configured. Please set up regions with countries in your Admin.";

pub async fn edge_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let inner = state.inner.load_full();
    inner.request_count.fetch_add(1, Ordering::Relaxed);

    let path = request.uri().path().to_string();

    if let Some(sub_path) = inner.ingest.sub_path(&path) {
        let analytics = &inner.config.analytics;
        return handle_ingest(
            &inner.hosts,
            &inner.forwarder,
            request,
            sub_path,
            analytics.answer_preflight,
            Duration::from_secs(analytics.timeout_secs),
        )
        .await;
    }

    if inner.bypass.matches(&path) {
        let response = next.run(request).await;
        metrics::record_request("bypass", response.status().as_u16(), start);
        return response;
    }

    let (outcome, response) = dispatch_region(&inner, request, &path, next).await;
    metrics::record_request(outcome, response.status().as_u16(), start);
    response
}

async fn dispatch_region(
    inner: &EdgeState,
    request: Request<Body>,
    path: &str,
    next: Next,
) -> (&'static str, Response) {
    let headers = request.headers();
    let cache_id = read_cache_id(headers);

    let lookup = match inner
        .regions
        .get_or_refresh(cache_id.as_deref().unwrap_or_default())
        .await
    {
        Ok(lookup) => lookup,
        Err(e) => {
            tracing::error!(request_id = %request_id(headers), error = %e, "Region lookup failed");
            return (
                "config_error",
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            );
        }
    };

    if let RegionLookup::Fallback { reason, .. } = &lookup {
        tracing::debug!(request_id = %request_id(headers), reason = %reason, "Serving fallback region");
    }

    let geo = geo_country(headers, &inner.config.regions.geo_headers);
    let country = resolve_country_code(
        path,
        geo.as_deref(),
        inner.regions.default_country(),
        lookup.map(),
    );

    let origin = request_origin(
        headers,
        inner.config.site.public_origin.as_deref(),
        inner.config.listener.tls.is_some(),
    );
    let view = RequestView {
        origin: &origin,
        path,
        query: request.uri().query(),
        cache_id: cache_id.as_deref(),
    };
    let dispatch = decide(&view, country.as_deref(), new_cache_id);

    tracing::debug!(
        request_id = %request_id(headers),
        path = %path,
        country = ?country,
        dispatch = ?dispatch,
        "Region dispatch"
    );

    match dispatch {
        Dispatch::PassThrough => ("pass_through", next.run(request).await),
        Dispatch::SetCacheId { location, cache_id } => {
            let mut response = temporary_redirect(&location);
            response
                .headers_mut()
                .append(header::SET_COOKIE, cache_id_set_cookie(&cache_id));
            ("set_cache_id", response)
        }
        Dispatch::Redirect { location } => ("redirect", temporary_redirect(&location)),
        Dispatch::NoRegions => {
            tracing::error!(request_id = %request_id(headers), "No regions with countries available");
            (
                "no_regions",
                (StatusCode::INTERNAL_SERVER_ERROR, NO_REGIONS_MESSAGE).into_response(),
            )
        }
    }
}

/// 307 to `location`. Locations are built from already valid request parts;
/// anything else is answered with 400.
fn temporary_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = StatusCode::TEMPORARY_REDIRECT.into_response();
            response.headers_mut().insert(header::LOCATION, value);
            response
        }
        Err(_) => (StatusCode::BAD_REQUEST, "Invalid redirect location").into_response(),
    }
}
