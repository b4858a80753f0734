use serde::Deserialize;

pub const SAFETY_MARGIN_SECONDS_DEFAULT: u64 = 300;

/// ================================
/// Global publisher-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    /// token is reused only while more than this many seconds remain
    #[serde(default = "default_safety_margin_seconds")]
    pub safety_margin_seconds: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            safety_margin_seconds: default_safety_margin_seconds(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            logging: None,
            dispatch: DispatchConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    /// invariant: >= base_delay_ms
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,
    /// whole exchange: handshake, write, read
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            request_ms: default_request_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DispatchConfig {
    /// exit status reflects any endpoint failure, not only token failures
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub stop_endpoint_on_error: bool,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

fn default_safety_margin_seconds() -> u64 {
    SAFETY_MARGIN_SECONDS_DEFAULT
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    1000
}

fn default_connect_ms() -> u64 {
    10_000
}

fn default_request_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_string()
}
