//! Redirect decision for region-aware requests.
//!
//! Pure function of the request's URL parts, cookie state and the resolved
//! country; the middleware turns the outcome into a response.

use crate::regions::path_country_segment;

/// What the edge does with a request that reached region handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Country segment present and cache id known: hand to the storefront.
    PassThrough,
    /// Country segment present but no cache id: redirect to the same URL,
    /// issuing the cookie.
    SetCacheId { location: String, cache_id: String },
    /// No country segment: redirect to the country-prefixed URL.
    Redirect { location: String },
    /// No country could be resolved at all.
    NoRegions,
}

/// URL and cookie state the decision depends on.
#[derive(Debug, Clone)]
pub struct RequestView<'a> {
    /// Scheme and authority, e.g. `https://shop.example.com`.
    pub origin: &'a str,
    pub path: &'a str,
    /// Raw query string without the `?`.
    pub query: Option<&'a str>,
    /// Cache id from the request cookie, if any.
    pub cache_id: Option<&'a str>,
}

impl RequestView<'_> {
    fn query_suffix(&self) -> String {
        match self.query {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        }
    }

    /// The request URL as the client sees it.
    pub fn full_url(&self) -> String {
        format!("{}{}{}", self.origin, self.path, self.query_suffix())
    }

    /// The request URL with `country` as the first path segment.
    pub fn country_url(&self, country: &str) -> String {
        let path = if self.path == "/" { "" } else { self.path };
        format!("{}/{}{}{}", self.origin, country, path, self.query_suffix())
    }
}

/// Decide the outcome. `new_cache_id` is only called when a cookie has to be
/// issued.
pub fn decide(
    view: &RequestView<'_>,
    country: Option<&str>,
    new_cache_id: impl FnOnce() -> String,
) -> Dispatch {
    let Some(country) = country else {
        return Dispatch::NoRegions;
    };

    let url_has_country = path_country_segment(view.path)
        .map(|segment| segment == country.to_lowercase())
        .unwrap_or(false);

    match (url_has_country, view.cache_id) {
        (true, Some(_)) => Dispatch::PassThrough,
        (true, None) => Dispatch::SetCacheId {
            location: view.full_url(),
            cache_id: new_cache_id(),
        },
        (false, _) => Dispatch::Redirect {
            location: view.country_url(country),
        },
    }
}
