//! Analytics upstream selection.

use thiserror::Error;
use url::Url;

use crate::config::AnalyticsConfig;
use crate::http::forward::ForwardProfile;

pub const EU_ASSETS_HOST: &str = "https://eu-assets.i.posthog.com";
pub const US_ASSETS_HOST: &str = "https://us-assets.i.posthog.com";

/// Sub-path markers served by the assets host.
const ASSET_MARKERS: &[&str] = &["static", "array"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsRegion {
    Eu,
    Us,
}

impl AnalyticsRegion {
    /// EU when the collection host is an EU host.
    pub fn from_host(host: &Url) -> Self {
        match host.host_str() {
            Some(h) if h.starts_with("eu.") || h.contains(".eu.") || h.starts_with("eu-") => {
                AnalyticsRegion::Eu
            }
            _ => AnalyticsRegion::Us,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsRegion::Eu => "eu",
            AnalyticsRegion::Us => "us",
        }
    }

    fn assets_host(self) -> &'static str {
        match self {
            AnalyticsRegion::Eu => EU_ASSETS_HOST,
            AnalyticsRegion::Us => US_ASSETS_HOST,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid analytics host {value}: {source}")]
pub struct HostError {
    value: String,
    #[source]
    source: url::ParseError,
}

/// Resolved upstream for one ingest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestTarget {
    pub url: String,
    pub profile: ForwardProfile,
}

/// The two analytics hosts.
#[derive(Debug, Clone)]
pub struct IngestHosts {
    primary: String,
    assets: String,
    region: AnalyticsRegion,
}

impl IngestHosts {
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self, HostError> {
        let primary = parse_host(&config.host)?;
        let region = AnalyticsRegion::from_host(&primary);
        let assets = match &config.assets_host {
            Some(assets) => base(&parse_host(assets)?),
            None => region.assets_host().to_string(),
        };

        Ok(Self {
            primary: base(&primary),
            assets,
            region,
        })
    }

    pub fn region(&self) -> AnalyticsRegion {
        self.region
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn assets(&self) -> &str {
        &self.assets
    }

    /// Outbound URL for a sub-path (below the ingest prefix) and query.
    pub fn target(&self, sub_path: &str, query: Option<&str>) -> IngestTarget {
        let (host, profile) = if is_asset_path(sub_path) {
            (&self.assets, ForwardProfile::IngestAssets)
        } else {
            (&self.primary, ForwardProfile::IngestPrimary)
        };

        let mut url = format!("{host}/{sub_path}");
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(q);
        }
        IngestTarget { url, profile }
    }
}

fn is_asset_path(sub_path: &str) -> bool {
    let first = sub_path.split('/').next().unwrap_or_default();
    ASSET_MARKERS.contains(&first)
}

fn parse_host(value: &str) -> Result<Url, HostError> {
    Url::parse(value).map_err(|source| HostError {
        value: value.to_string(),
        source,
    })
}

/// Scheme, host and any base path, without a trailing slash.
fn base(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
