//! The cache-identifier cookie.

use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::CookieJar;
use cookie::time::Duration;
use cookie::Cookie;
use uuid::Uuid;

pub const CACHE_ID_COOKIE: &str = "_medusa_cache_id";

/// Cookie lifetime: 24 hours.
pub const CACHE_ID_MAX_AGE_SECS: i64 = 60 * 60 * 24;

/// Value of the cache-id cookie, if the client sent one.
pub fn read_cache_id(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(CACHE_ID_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn new_cache_id() -> String {
    Uuid::new_v4().to_string()
}

/// `Set-Cookie` value for a freshly issued cache id.
pub fn cache_id_set_cookie(cache_id: &str) -> HeaderValue {
    let cookie = Cookie::build((CACHE_ID_COOKIE, cache_id.to_string()))
        .path("/")
        .max_age(Duration::seconds(CACHE_ID_MAX_AGE_SECS))
        .build();
    // Cache ids are UUIDs, always valid header text.
    HeaderValue::from_str(&cookie.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("_medusa_cache_id=; Path=/"))
}
