//! Storefront edge library.
//!
//! Sits in front of the storefront renderer: pins every page URL to a
//! country code, issues the `_medusa_cache_id` cookie, and relays analytics
//! traffic under `/ph` to PostHog byte for byte.

pub mod admin;
pub mod config;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod regions;
pub mod routing;
pub mod security;

pub use config::schema::EdgeConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
