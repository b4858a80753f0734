use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::{PublishError, PublishResult};

pub static TOKEN_CACHE_HIT: &str = "cache_hit";
pub static TOKEN_REFRESHED: &str = "refreshed";
pub static TOKEN_FAILED: &str = "failed";

/// Run metrics. Each instance owns its registry so independent runs (and
/// tests) never share counters.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_requests: IntCounterVec,

    // OMF metrics
    pub omf_messages: IntCounterVec,
    pub omf_message_failures: IntCounterVec,
    pub endpoint_dispatch_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> PublishResult<Self> {
        let registry =
            Registry::new_custom(Some("omfpublisher".into()), None).map_err(metrics_error)?;

        let metrics = Self {
            token_requests: IntCounterVec::new(
                Opts::new("token_requests_total", "Token lookups by outcome"),
                &["endpoint", "outcome"],
            )
            .map_err(metrics_error)?,
            omf_messages: IntCounterVec::new(
                Opts::new("omf_messages_total", "OMF messages accepted"),
                &["endpoint", "message_type"],
            )
            .map_err(metrics_error)?,
            omf_message_failures: IntCounterVec::new(
                Opts::new("omf_message_failures_total", "OMF message failures by reason"),
                &["endpoint", "reason"],
            )
            .map_err(metrics_error)?,
            endpoint_dispatch_duration: HistogramVec::new(
                HistogramOpts::new(
                    "endpoint_dispatch_duration_seconds",
                    "Time spent delivering all messages to one endpoint",
                )
                .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
                &["endpoint"],
            )
            .map_err(metrics_error)?,
            registry,
        };

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_requests.clone()))
            .map_err(metrics_error)?;
        reg.register(Box::new(metrics.omf_messages.clone()))
            .map_err(metrics_error)?;
        reg.register(Box::new(metrics.omf_message_failures.clone()))
            .map_err(metrics_error)?;
        reg.register(Box::new(metrics.endpoint_dispatch_duration.clone()))
            .map_err(metrics_error)?;

        Ok(metrics)
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> PublishResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer)
            .map_err(|e| PublishError::config(format!("metrics are not utf-8: {}", e)))
    }
}

fn metrics_error(err: prometheus::Error) -> PublishError {
    PublishError::config(format!("metrics setup failed: {}", err))
}
