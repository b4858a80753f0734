use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cache::token_cache::TokenCache;
use crate::config::endpoint::EndpointConfig;
use crate::config::settings::SettingsConfig;
use crate::dispatch::outcome::DispatchOutcome;
use crate::error::{PublishError, PublishResult};
use crate::helpers::time::get_instant;
use crate::observability::metrics::Metrics;
use crate::omf::{build_omf_request, OmfMessage};
use crate::resilience::retry::RetrySettings;
use crate::transport::HttpTransport;

const ERROR_BODY_LIMIT: usize = 512;

/// One configured endpoint together with the transport built for it.
#[derive(Debug)]
pub struct EndpointTarget<T> {
    pub index: usize,
    pub config: Arc<EndpointConfig>,
    pub transport: T,
}

impl<T> EndpointTarget<T> {
    pub fn new(index: usize, config: EndpointConfig, transport: T) -> Self {
        Self {
            index,
            config: Arc::new(config),
            transport,
        }
    }
}

/// Fans OMF messages out to every endpoint. Endpoints run as independent
/// tasks; one endpoint's failure never stops another.
pub struct Dispatcher<T> {
    targets: Vec<Arc<EndpointTarget<T>>>,
    tokens: Arc<TokenCache>,
    retry: RetrySettings,
    stop_endpoint_on_error: bool,
    metrics: Arc<Metrics>,
}

impl<T> Dispatcher<T>
where
    T: HttpTransport + Send + Sync + 'static,
{
    pub fn new(
        targets: Vec<EndpointTarget<T>>,
        tokens: Arc<TokenCache>,
        settings: &SettingsConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            targets: targets.into_iter().map(Arc::new).collect(),
            tokens,
            retry: RetrySettings::from(&settings.retry),
            stop_endpoint_on_error: settings.dispatch.stop_endpoint_on_error,
            metrics,
        }
    }

    /// Deliver `messages`, in order, to every endpoint. Outcomes come back
    /// ordered by endpoint index, one per endpoint.
    pub async fn dispatch_all(&self, messages: Arc<[OmfMessage]>) -> Vec<DispatchOutcome> {
        info!(
            endpoints = self.targets.len(),
            messages = messages.len(),
            "dispatch started"
        );

        let mut join_set = JoinSet::new();
        for target in &self.targets {
            let worker = EndpointWorker {
                target: target.clone(),
                tokens: self.tokens.clone(),
                retry: self.retry.clone(),
                stop_on_error: self.stop_endpoint_on_error,
                metrics: self.metrics.clone(),
                messages: messages.clone(),
            };
            join_set.spawn(worker.run());
        }

        let mut outcomes = Vec::with_capacity(self.targets.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("endpoint worker did not complete: {}", e),
            }
        }

        // a worker that panicked still gets an outcome
        for target in &self.targets {
            if !outcomes.iter().any(|o| o.endpoint_index == target.index) {
                outcomes.push(DispatchOutcome::failed(
                    target.index,
                    target.config.name(),
                    0,
                    &PublishError::Worker("panicked or cancelled before reporting".to_owned()),
                ));
            }
        }

        outcomes.sort_by_key(|o| o.endpoint_index);
        outcomes
    }
}

struct EndpointWorker<T> {
    target: Arc<EndpointTarget<T>>,
    tokens: Arc<TokenCache>,
    retry: RetrySettings,
    stop_on_error: bool,
    metrics: Arc<Metrics>,
    messages: Arc<[OmfMessage]>,
}

impl<T> EndpointWorker<T>
where
    T: HttpTransport + Send + Sync + 'static,
{
    async fn run(self) -> DispatchOutcome {
        let index = self.target.index;
        let name = self.target.config.name().to_owned();
        let started = get_instant();

        // token first: an endpoint that cannot authenticate receives nothing
        if let Err(e) = self.token().await {
            error!(endpoint = %name, error = %e, "unable to obtain token");
            self.observe(&name, started);
            return DispatchOutcome::failed(index, &name, 0, &e);
        }

        let mut sent = 0;
        let mut first_error: Option<PublishError> = None;
        for message in self.messages.iter() {
            // cheap when cached, refreshes if the run outlives the token
            let token = match self.token().await {
                Ok(token) => token,
                Err(e) => {
                    error!(endpoint = %name, error = %e, "unable to obtain token");
                    first_error.get_or_insert(e);
                    break;
                }
            };

            match self.send_message(message, token.as_deref()).await {
                Ok(()) => {
                    sent += 1;
                    self.metrics
                        .omf_messages
                        .with_label_values(&[name.as_str(), message.message_type.as_header_value()])
                        .inc();
                    debug!(endpoint = %name, message_type = %message.message_type, "message accepted");
                }
                Err(e) => {
                    warn!(endpoint = %name, message_type = %message.message_type, error = %e, "message failed");
                    self.metrics
                        .omf_message_failures
                        .with_label_values(&[name.as_str(), e.category().as_str()])
                        .inc();
                    first_error.get_or_insert(e);
                    if self.stop_on_error {
                        break;
                    }
                }
            }
        }

        self.observe(&name, started);
        match first_error {
            None => {
                info!(endpoint = %name, messages = sent, "all messages delivered");
                DispatchOutcome::succeeded(index, &name, sent)
            }
            Some(e) => DispatchOutcome::failed(index, &name, sent, &e),
        }
    }

    async fn token(&self) -> PublishResult<Option<String>> {
        self.tokens
            .get_token(&self.target.config, &self.target.transport)
            .await
    }

    async fn send_message(&self, message: &OmfMessage, token: Option<&str>) -> PublishResult<()> {
        let request = build_omf_request(&self.target.config, message, token)?;
        let transport = &self.target.transport;
        let message_type = message.message_type.as_header_value();

        self.retry
            .run_with_retry(|| {
                let request = request.clone();
                async move {
                    let url = request.url.clone();
                    let response = transport.send(request).await?;
                    if response.is_success() {
                        Ok(())
                    } else {
                        Err(PublishError::Dispatch {
                            url,
                            message_type: message_type.to_owned(),
                            status: response.status.as_u16(),
                            body: response.text().chars().take(ERROR_BODY_LIMIT).collect(),
                        })
                    }
                }
            })
            .await
    }

    fn observe(&self, name: &str, started: tokio::time::Instant) {
        self.metrics
            .endpoint_dispatch_duration
            .with_label_values(&[name])
            .observe(started.elapsed().as_secs_f64());
    }
}
