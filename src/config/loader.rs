//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{EdgeConfig, Environment};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply process environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<EdgeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => EdgeConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay the storefront's deployment variables on top of file config.
///
/// Variable names match the ones the storefront already deploys with, so one
/// environment serves both processes. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut EdgeConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get("MEDUSA_BACKEND_URL") {
        config.regions.backend_url = Some(url);
    }
    if let Some(key) = get("NEXT_PUBLIC_MEDUSA_PUBLISHABLE_KEY") {
        config.regions.publishable_key = Some(key);
    }
    if let Some(region) = get("NEXT_PUBLIC_DEFAULT_REGION") {
        config.regions.default_country = region.to_lowercase();
    }
    if let Some(host) = get("NEXT_PUBLIC_POSTHOG_HOST") {
        config.analytics.host = host;
    }
    if let Some(key) = get("NEXT_PUBLIC_POSTHOG_KEY") {
        config.analytics.api_key = Some(key);
    }
    if let Some(env) = get("NODE_ENV") {
        config.observability.environment = if env.eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        };
    }
    if let Some(origin) = get("STOREFRONT_ORIGIN_URL") {
        config.site.origin_url = origin;
    }
    if let Some(addr) = get("EDGE_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = EdgeConfig::default();
        config.regions.default_country = "de".to_string();

        let env: HashMap<&str, &str> = [
            ("MEDUSA_BACKEND_URL", "https://api.example.com"),
            ("NEXT_PUBLIC_DEFAULT_REGION", "GB"),
            ("NEXT_PUBLIC_POSTHOG_HOST", "https://eu.i.posthog.com"),
            ("NODE_ENV", "development"),
            ("NEXT_PUBLIC_MEDUSA_PUBLISHABLE_KEY", ""),
        ]
        .into_iter()
        .collect();

        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.regions.backend_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.regions.default_country, "gb");
        assert_eq!(config.analytics.host, "https://eu.i.posthog.com");
        assert!(config.observability.environment.is_development());
        // Empty values do not clobber.
        assert_eq!(config.regions.publishable_key, None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [regions]
            backend_url = "http://localhost:9000"
            default_country = "dk"
            "#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(config.regions.backend_url.is_some());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[regions\nbroken").unwrap();

        assert!(matches!(load_config(Some(file.path())), Err(ConfigError::Parse(_))));
    }
}
