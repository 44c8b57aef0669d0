//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// Paths served by the static pages.
const PAGE_PATHS: [&str; 2] = ["/", "/player"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Check semantic constraints serde cannot express. Reports every problem,
/// not just the first.
pub fn validate_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    let routes = &config.routes;
    let mut seen: Vec<&str> = PAGE_PATHS.to_vec();
    let all_paths = [&routes.proxy_path, &routes.health_path]
        .into_iter()
        .chain(routes.proxy_aliases.iter());
    for path in all_paths {
        if !path.starts_with('/') {
            problems.push(format!("route path '{path}' must start with '/'"));
        } else if seen.contains(&path.as_str()) {
            problems.push(format!("route path '{path}' is used more than once"));
        }
        seen.push(path);
    }

    if config.upstream.timeout_secs == 0 {
        problems.push("upstream.timeout_secs must be greater than 0".to_string());
    }
    if config.upstream.connect_timeout_secs == 0 {
        problems.push("upstream.connect_timeout_secs must be greater than 0".to_string());
    }

    if let Some(origin) = &config.server.public_origin {
        if !is_http_url(origin) {
            problems.push(format!("server.public_origin '{origin}' is not an http(s) URL"));
        }
    }

    for provider in &config.providers {
        if !is_http_url(&provider.site) {
            problems.push(format!(
                "provider '{}' site '{}' is not an http(s) URL",
                provider.name, provider.site
            ));
        }
        if provider.host_fragments.iter().all(|f| f.is_empty()) {
            problems.push(format!("provider '{}' has no host fragments", provider.name));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(problems))
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}
