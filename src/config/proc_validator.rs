//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Runs after normalization and before any network activity:
//!   * endpoint names are unique
//!   * resources are absolute http/https urls with a host
//!   * retry and timeout invariants

use std::collections::HashSet;

use reqwest::Url;
use tracing::{error, info};

use crate::config::endpoint::EndpointConfig;
use crate::config::service::ServiceConfig;
use crate::config::settings::{RetryConfig, SettingsConfig, TimeoutConfig};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);

    if cfg.endpoints.is_empty() {
        errors.push("config: 'endpoints' is empty; at least one endpoint required".to_string());
    }

    let mut names: HashSet<&str> = HashSet::new();
    for endpoint in &cfg.endpoints {
        if !names.insert(endpoint.name()) {
            errors.push(format!("endpoint['{}']: duplicate endpoint name", endpoint.name()));
        }
        validate_endpoint(endpoint, &mut errors);
    }

    if errors.is_empty() {
        info!("config is valid, endpoints: {}", cfg.endpoints.len());
        Ok(())
    } else {
        for e in &errors {
            error!("config validation: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    validate_retry("settings.retry", &settings.retry, errors);
    validate_timeouts("settings.timeouts", &settings.timeouts, errors);

    if let Some(logging) = &settings.logging {
        let level = logging.level.to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of trace, debug, info, warn, error",
                logging.level
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == 0 {
        errors.push(format!("{}.attempts must be >= 1", path));
    }
    if retry.max_delay_ms < retry.base_delay_ms {
        errors.push(format!(
            "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
            path, retry.max_delay_ms, retry.base_delay_ms
        ));
    }
}

fn validate_timeouts(path: &str, timeouts: &TimeoutConfig, errors: &mut Vec<String>) {
    if timeouts.connect_ms == 0 {
        errors.push(format!("{}.connect_ms must be > 0", path));
    }
    if timeouts.request_ms == 0 {
        errors.push(format!("{}.request_ms must be > 0", path));
    }
}

fn validate_endpoint(endpoint: &EndpointConfig, errors: &mut Vec<String>) {
    let name = endpoint.name();
    match Url::parse(endpoint.resource()) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(format!(
                    "endpoint['{}'].resource must use http or https, got '{}'",
                    name,
                    url.scheme()
                ));
            }
            if url.host_str().map(str::is_empty).unwrap_or(true) {
                errors.push(format!("endpoint['{}'].resource has no host", name));
            }
        }
        Err(e) => errors.push(format!(
            "endpoint['{}'].resource '{}' is not an absolute url: {}",
            name,
            endpoint.resource(),
            e
        )),
    }
}
