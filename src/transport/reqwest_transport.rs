use std::error::Error as StdError;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::endpoint::EndpointConfig;
use crate::config::settings::TimeoutConfig;
use crate::error::{PublishError, PublishResult};
use crate::transport::target::RequestTarget;
use crate::transport::{HttpTransport, TransportRequest, TransportResponse};

static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Certificate verification choice, made by whoever builds the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    Verify,
    SkipVerification,
}

impl TlsPolicy {
    pub fn from_verify_ssl(verify_ssl: bool) -> Self {
        if verify_ssl {
            TlsPolicy::Verify
        } else {
            TlsPolicy::SkipVerification
        }
    }
}

/// reqwest + rustls transport. Idle connections are never kept, so each
/// `send` resolves, connects, handshakes (SNI from the url host) and closes.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    tls: TlsPolicy,
}

impl ReqwestTransport {
    pub fn new(tls: TlsPolicy, timeouts: &TimeoutConfig) -> PublishResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_millis(timeouts.connect_ms))
            .timeout(Duration::from_millis(timeouts.request_ms))
            .pool_max_idle_per_host(0)
            .danger_accept_invalid_certs(tls == TlsPolicy::SkipVerification)
            .build()
            .map_err(|e| {
                PublishError::transport(
                    "",
                    format!("unable to build http client: {}", error_chain(&e)),
                    false,
                )
            })?;
        Ok(Self { client, tls })
    }

    pub fn for_endpoint(
        endpoint: &EndpointConfig,
        timeouts: &TimeoutConfig,
    ) -> PublishResult<Self> {
        Self::new(TlsPolicy::from_verify_ssl(endpoint.verify_ssl()), timeouts)
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> PublishResult<TransportResponse> {
        let target = RequestTarget::parse(&request.url)?;
        debug!(
            method = %request.method,
            host = %target.host,
            port = target.port,
            path = %target.path,
            "sending request"
        );
        if target.is_tls() && self.tls == TlsPolicy::SkipVerification {
            warn!(host = %target.host, "certificate verification disabled for this endpoint");
        }

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(&request.url, &e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(&request.url, &e))?;

        debug!(status = status.as_u16(), bytes = body.len(), host = %target.host, "response received");

        Ok(TransportResponse {
            url: request.url,
            status,
            body: body.to_vec(),
        })
    }
}

fn classify(url: &str, err: &reqwest::Error) -> PublishError {
    let reason = error_chain(err);
    if err.is_timeout() {
        PublishError::transport(url, format!("timed out: {}", reason), true)
    } else if err.is_builder() {
        PublishError::transport(url, format!("invalid request: {}", reason), false)
    } else if err.is_connect() {
        PublishError::transport(url, format!("connect failed: {}", reason), true)
    } else {
        PublishError::transport(url, reason, true)
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}
