use serde::Deserialize;

use crate::config::endpoint::{EndpointConfig, RawEndpointDescriptor};
use crate::config::settings::SettingsConfig;

/// ================================
/// Configuration file as written by the user
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct RawServiceConfig {
    pub endpoints: Vec<RawEndpointDescriptor>,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Full publisher configuration, endpoints normalized
/// ================================
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub settings: SettingsConfig,
    pub endpoints: Vec<EndpointConfig>,
}
