use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::endpoint::EndpointConfig;
use crate::config::proc_validator;
use crate::config::service::{RawServiceConfig, ServiceConfig};
use crate::error::{PublishError, PublishResult};

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("env placeholder pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Json,
        }
    }
}

/// Load, normalize and validate the configuration file
pub async fn file_to_config(path: &Path) -> PublishResult<ServiceConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        PublishError::config(format!("unable to read '{}': {}", path.display(), e))
    })?;

    parse_config(&content, ConfigFormat::from_path(path))
}

/// Parse, expand `${VAR}` / `${VAR:default}` inside string values, then
/// normalize and validate. Expanded values are never re-parsed, so they may
/// contain quotes, backslashes or newlines.
pub fn parse_config(content: &str, format: ConfigFormat) -> PublishResult<ServiceConfig> {
    let mut document: Value = match format {
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
    }
    .map_err(|e| {
        error!("parse config error: {}", e);
        PublishError::config(format!("unable to parse config: {}", e))
    })?;

    expand_env_in_strings(&mut document);

    let raw: RawServiceConfig = serde_json::from_value(document).map_err(|e| {
        error!("parse config error: {}", e);
        PublishError::config(format!("unable to parse config: {}", e))
    })?;

    let endpoints = raw
        .endpoints
        .iter()
        .enumerate()
        .map(|(index, descriptor)| EndpointConfig::normalize(descriptor, index))
        .collect::<PublishResult<Vec<_>>>()?;

    let service_config = ServiceConfig {
        settings: raw.settings,
        endpoints,
    };

    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .map_err(|errors| PublishError::config(errors.join("; ")))?;

    Ok(service_config)
}

fn expand_env_in_strings(value: &mut Value) {
    match value {
        Value::String(text) => {
            if ENV_PLACEHOLDER.is_match(text) {
                *text = expand_env_vars(text);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_strings),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_strings),
        _ => {}
    }
}

fn expand_env_vars(input: &str) -> String {
    ENV_PLACEHOLDER
        .replace_all(input, |caps: &regex::Captures| {
            let var = &caps[1];
            let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var).unwrap_or_else(|_| default.to_string())
        })
        .to_string()
}
