//! Where regions come from.
//!
//! `RegionSource` is the outbound port; `HttpRegionSource` talks to the
//! commerce backend's store API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::regions::types::{Region, RegionsPayload};

pub const PUBLISHABLE_KEY_HEADER: &str = "x-publishable-api-key";

/// Reasons a region fetch can fail. All of them are recoverable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("region backend timed out")]
    Timeout,

    #[error("region backend unreachable: {0}")]
    Network(#[source] reqwest::Error),

    #[error("region backend answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("region backend sent an unreadable body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Network(e)
        }
    }
}

#[async_trait]
pub trait RegionSource: Send + Sync {
    async fn fetch_regions(&self) -> Result<Vec<Region>, FetchError>;
}

/// Fetches `GET {backend}/store/regions`.
pub struct HttpRegionSource {
    client: reqwest::Client,
    endpoint: Url,
    publishable_key: String,
}

impl HttpRegionSource {
    pub fn new(
        backend_url: &str,
        publishable_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SourceInitError> {
        let endpoint = regions_endpoint(backend_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SourceInitError::Client)?;

        Ok(Self {
            client,
            endpoint,
            publishable_key: publishable_key.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Error)]
pub enum SourceInitError {
    #[error("invalid backend URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

fn regions_endpoint(backend_url: &str) -> Result<Url, SourceInitError> {
    let base = backend_url.trim_end_matches('/');
    Url::parse(&format!("{base}/store/regions")).map_err(|source| SourceInitError::InvalidUrl {
        url: backend_url.to_string(),
        source,
    })
}

#[async_trait]
impl RegionSource for HttpRegionSource {
    async fn fetch_regions(&self) -> Result<Vec<Region>, FetchError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(PUBLISHABLE_KEY_HEADER, &self.publishable_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| "Failed fetching regions from backend".to_string());
            return Err(FetchError::Status { status, message });
        }

        let bytes = response.bytes().await?;
        let payload: RegionsPayload =
            serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(payload.into_regions())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let a = regions_endpoint("https://api.example.com/").unwrap();
        let b = regions_endpoint("https://api.example.com").unwrap();
        assert_eq!(a.as_str(), "https://api.example.com/store/regions");
        assert_eq!(a, b);
    }

    #[test]
    fn test_endpoint_rejects_garbage() {
        assert!(matches!(
            regions_endpoint("::nope"),
            Err(SourceInitError::InvalidUrl { .. })
        ));
    }
}
