//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the storefront edge.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Storefront origin and redirect behaviour.
    pub site: SiteConfig,

    /// Region backend and country resolution.
    pub regions: RegionConfig,

    /// Analytics ingest proxy.
    pub analytics: AnalyticsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Storefront origin and URL handling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Storefront renderer that receives pass-through requests.
    pub origin_url: String,

    /// Public origin used in redirect locations (e.g. "https://shop.example.com").
    /// Derived from the request when unset.
    pub public_origin: Option<String>,

    /// Path prefixes that skip region handling entirely.
    pub bypass_prefixes: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin_url: "http://127.0.0.1:3000".to_string(),
            public_origin: None,
            bypass_prefixes: vec![
                "/api".to_string(),
                "/_next".to_string(),
                "/images".to_string(),
                "/assets".to_string(),
            ],
        }
    }
}

/// Region backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    /// Commerce backend base URL. Required.
    pub backend_url: Option<String>,

    /// Value of the `x-publishable-api-key` header.
    pub publishable_key: Option<String>,

    /// Country used when nothing else resolves, and for the fallback region.
    pub default_country: String,

    /// Region cache lifetime in seconds.
    pub refresh_secs: u64,

    /// Timeout for the region fetch in seconds.
    pub fetch_timeout_secs: u64,

    /// Headers carrying the client's geolocated country, checked in order.
    pub geo_headers: Vec<String>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            publishable_key: None,
            default_country: "us".to_string(),
            refresh_secs: 3600,
            fetch_timeout_secs: 10,
            geo_headers: vec![
                "x-vercel-ip-country".to_string(),
                "cf-ipcountry".to_string(),
            ],
        }
    }
}

/// Analytics ingest proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Primary collection host.
    pub host: String,

    /// Static assets host. Derived from `host` when unset.
    pub assets_host: Option<String>,

    /// Project key. Reported by `/admin/status` as configured or not, never required
    /// for forwarding.
    pub api_key: Option<String>,

    /// Path prefixes relayed to the analytics hosts.
    pub ingest_prefixes: Vec<String>,

    /// Upstream timeout in seconds.
    pub timeout_secs: u64,

    /// Answer CORS preflight locally instead of forwarding it.
    pub answer_preflight: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            host: "https://us.i.posthog.com".to_string(),
            assets_host: None,
            api_key: None,
            ingest_prefixes: vec!["/ph".to_string(), "/ingest".to_string()],
            timeout_secs: 25,
            answer_preflight: true,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Storefront origin timeout in seconds. Must stay below `request_secs`.
    pub upstream_secs: u64,
}

/// Headroom kept between the upstream deadline and the request deadline.
const UPSTREAM_MARGIN: Duration = Duration::from_millis(250);

impl TimeoutConfig {
    /// Deadline for the storefront origin forward. Always ends before the
    /// request timeout so a slow origin is answered with 504, not 408.
    pub fn upstream_budget(&self) -> Duration {
        let ceiling = Duration::from_secs(self.request_secs).saturating_sub(UPSTREAM_MARGIN);
        Duration::from_secs(self.upstream_secs).min(ceiling)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            upstream_secs: 25,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum forwarded request body in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB, session recordings are large
        }
    }
}

/// Deployment environment. Controls how loudly degraded paths are logged.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    pub environment: Environment,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            environment: Environment::Production,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
