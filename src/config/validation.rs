//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Fail fast on the one fatal omission: the commerce backend URL
//! - Validate value ranges (timeouts > 0, country code shape, URL syntax)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;
use url::Url;

use crate::config::schema::{EdgeConfig, PLACEHOLDER_ADMIN_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "regions.backend_url is not set. Define MEDUSA_BACKEND_URL (the variable is no longer named NEXT_PUBLIC_MEDUSA_BACKEND_URL)"
    )]
    MissingBackendUrl,

    #[error("{field} is not a valid absolute URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("regions.default_country must be a two-letter country code, got {0:?}")]
    InvalidCountryCode(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field} entry {value:?} must start with '/'")]
    InvalidPrefix { field: &'static str, value: String },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} ({value}s) must be below timeouts.request_secs ({request_secs}s)")]
    TimeoutNotBelowRequest {
        field: &'static str,
        value: u64,
        request_secs: u64,
    },
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.regions.backend_url.as_deref() {
        None | Some("") => errors.push(ValidationError::MissingBackendUrl),
        Some(url) => check_url(&mut errors, "regions.backend_url", url),
    }

    check_url(&mut errors, "site.origin_url", &config.site.origin_url);
    if let Some(origin) = &config.site.public_origin {
        check_url(&mut errors, "site.public_origin", origin);
    }
    check_url(&mut errors, "analytics.host", &config.analytics.host);
    if let Some(assets) = &config.analytics.assets_host {
        check_url(&mut errors, "analytics.assets_host", assets);
    }

    if !is_country_code(&config.regions.default_country) {
        errors.push(ValidationError::InvalidCountryCode(
            config.regions.default_country.clone(),
        ));
    }

    for (field, value) in [
        ("regions.refresh_secs", config.regions.refresh_secs),
        ("regions.fetch_timeout_secs", config.regions.fetch_timeout_secs),
        ("analytics.timeout_secs", config.analytics.timeout_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    // Upstream deadlines must fire before the request timeout does.
    let request_secs = config.timeouts.request_secs;
    for (field, value) in [
        ("analytics.timeout_secs", config.analytics.timeout_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ] {
        if value >= request_secs && request_secs > 0 {
            errors.push(ValidationError::TimeoutNotBelowRequest {
                field,
                value,
                request_secs,
            });
        }
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    check_prefixes(&mut errors, "analytics.ingest_prefixes", &config.analytics.ingest_prefixes);
    check_prefixes(&mut errors, "site.bypass_prefixes", &config.site.bypass_prefixes);

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            tracing::warn!("Admin API enabled with the placeholder api_key");
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Two ASCII letters, any case.
pub fn is_country_code(value: &str) -> bool {
    value.len() == 2 && value.bytes().all(|b| b.is_ascii_alphabetic())
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    let valid = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
}

fn check_prefixes(errors: &mut Vec<ValidationError>, field: &'static str, prefixes: &[String]) {
    for prefix in prefixes {
        if !prefix.starts_with('/') || prefix.len() < 2 {
            errors.push(ValidationError::InvalidPrefix {
                field,
                value: prefix.clone(),
            });
        }
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> EdgeConfig {
        let mut config = EdgeConfig::default();
        config.regions.backend_url = Some("http://localhost:9000".to_string());
        config
    }

    #[test]
    fn test_default_config_requires_backend_url() {
        let errors = validate_config(&EdgeConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingBackendUrl]);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.regions.default_country = "usa".to_string();
        config.analytics.host = "not a url".to_string();
        config.analytics.timeout_secs = 0;
        config.analytics.ingest_prefixes = vec!["ph".to_string()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidCountryCode("usa".to_string())));
        assert!(errors.contains(&ValidationError::ZeroValue("analytics.timeout_secs")));
    }

    #[test]
    fn test_upstream_timeouts_must_be_below_request_timeout() {
        let mut config = valid_config();
        config.timeouts.request_secs = 1;
        config.timeouts.upstream_secs = 1;
        config.analytics.timeout_secs = 2;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TimeoutNotBelowRequest {
                    field: "analytics.timeout_secs",
                    value: 2,
                    request_secs: 1,
                },
                ValidationError::TimeoutNotBelowRequest {
                    field: "timeouts.upstream_secs",
                    value: 1,
                    request_secs: 1,
                },
            ]
        );
    }

    #[test]
    fn test_country_code_shape() {
        assert!(is_country_code("us"));
        assert!(is_country_code("DE"));
        assert!(!is_country_code("u1"));
        assert!(!is_country_code(""));
    }
}
