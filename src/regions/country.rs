//! Country code resolution for a single request.

use axum::http::HeaderMap;

use crate::regions::types::RegionMap;

/// First path segment, lower-cased. `/de/store` → `de`, `/` → `None`.
pub fn path_country_segment(path: &str) -> Option<String> {
    path.split('/')
        .nth(1)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Country reported by the first present geolocation header.
pub fn geo_country(headers: &HeaderMap, geo_headers: &[String]) -> Option<String> {
    geo_headers.iter().find_map(|name| {
        headers
            .get(name.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    })
}

/// Pick the country code for a request.
///
/// Order: URL segment, geolocation, configured default, then the first
/// country in the map. Each candidate must be present in the map. Returns
/// `None` only when the map is empty.
pub fn resolve_country_code(
    path: &str,
    geo_country: Option<&str>,
    default_country: &str,
    map: &RegionMap,
) -> Option<String> {
    if let Some(segment) = path_country_segment(path) {
        if map.contains(&segment) {
            return Some(segment);
        }
    }

    if let Some(geo) = geo_country.map(str::to_lowercase) {
        if map.contains(&geo) {
            return Some(geo);
        }
    }

    let default_country = default_country.to_lowercase();
    if map.contains(&default_country) {
        return Some(default_country);
    }

    map.first_country().map(str::to_string)
}
