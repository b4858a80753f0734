use tokio::time::{sleep, Duration};
use tracing::{error, warn};

use crate::config::settings::RetryConfig;
use crate::error::PublishResult;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&RetryConfig> for RetrySettings {
    fn from(retry: &RetryConfig) -> Self {
        Self {
            attempts: retry.attempts.max(1),
            base_delay_ms: retry.base_delay_ms,
            max_delay_ms: retry.max_delay_ms,
        }
    }
}

impl RetrySettings {
    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up. The delay doubles up to `max_delay_ms`.
    pub async fn run_with_retry<F, Fut, T>(&self, mut operation: F) -> PublishResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = PublishResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut delay = self.base_delay_ms;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("attempt {attempt}/{attempts} failed: {e}");
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(self.max_delay_ms);
                    attempt += 1;
                }
                Err(e) => {
                    error!("giving up after {attempt} attempt(s): {e}");
                    return Err(e);
                }
            }
        }
    }
}
