// tests/common/mod.rs
pub use serde_json::json;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use httpmock::Method::{GET, POST};
use httpmock::{Mock, MockServer};

use crate::config::endpoint::{EndpointConfig, RawEndpointDescriptor};
use crate::config::settings::TimeoutConfig;
use crate::error::PublishResult;
use crate::helpers::time::Clock;
use crate::transport::{HttpTransport, ReqwestTransport, TlsPolicy, TransportRequest, TransportResponse};

pub const DISCOVERY_PATH: &str = "/identity/.well-known/openid-configuration";
pub const TOKEN_PATH: &str = "/identity/connect/token";

/// Clock the test moves by hand.
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Real reqwest transport that also records every request it sends.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    inner: ReqwestTransport,
    sent: Arc<Mutex<Vec<TransportRequest>>>,
    /// moved forward once every token exchange has answered
    exchange_clock: Option<(Arc<ManualClock>, i64)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        let timeouts = TimeoutConfig {
            connect_ms: 1_000,
            request_ms: 5_000,
        };
        Self {
            inner: ReqwestTransport::new(TlsPolicy::Verify, &timeouts).expect("reqwest transport"),
            sent: Arc::new(Mutex::new(Vec::new())),
            exchange_clock: None,
        }
    }

    /// Token exchanges through this transport take `seconds` of `clock` time.
    pub fn with_slow_exchange(clock: Arc<ManualClock>, seconds: i64) -> Self {
        Self {
            exchange_clock: Some((clock, seconds)),
            ..Self::new()
        }
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of requests whose url ends with `path`.
    pub fn count(&self, path: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.url.ends_with(path))
            .count()
    }
}

impl HttpTransport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> PublishResult<TransportResponse> {
        self.sent.lock().unwrap().push(request.clone());
        let is_exchange = request.url.ends_with(TOKEN_PATH);
        let response = self.inner.send(request).await;
        if let (true, Some((clock, seconds))) = (is_exchange, &self.exchange_clock) {
            clock.advance(*seconds);
        }
        response
    }
}

pub fn ocs_endpoint(name: &str, resource: &str) -> EndpointConfig {
    let raw = RawEndpointDescriptor {
        name: Some(name.into()),
        endpoint_type: Some("OCS".into()),
        resource: Some(resource.into()),
        api_version: Some("v1".into()),
        tenant: Some("tenant".into()),
        namespace_name: Some("space".into()),
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        ..Default::default()
    };
    EndpointConfig::normalize(&raw, 0).expect("valid OCS endpoint")
}

pub fn pi_endpoint(name: &str, resource: &str) -> EndpointConfig {
    let raw = RawEndpointDescriptor {
        name: Some(name.into()),
        endpoint_type: Some("PI".into()),
        resource: Some(resource.into()),
        ..Default::default()
    };
    EndpointConfig::normalize(&raw, 0).expect("valid PI endpoint")
}

pub fn eds_endpoint(name: &str, resource: &str, use_compression: bool) -> EndpointConfig {
    let raw = RawEndpointDescriptor {
        name: Some(name.into()),
        endpoint_type: Some("EDS".into()),
        resource: Some(resource.into()),
        api_version: Some("v1".into()),
        use_compression: Some(use_compression),
        ..Default::default()
    };
    EndpointConfig::normalize(&raw, 0).expect("valid EDS endpoint")
}

/// Identity provider on `server`: discovery document plus a token endpoint
/// issuing `access_token` valid for `expires_in` seconds.
pub async fn mock_identity<'a>(
    server: &'a MockServer,
    access_token: &str,
    expires_in: u64,
) -> (Mock<'a>, Mock<'a>) {
    let token_url = server.url(TOKEN_PATH);
    let discovery = server
        .mock_async(|when, then| {
            when.method(GET).path(DISCOVERY_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "token_endpoint": token_url }));
        })
        .await;
    let token = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(TOKEN_PATH)
                .header("content-type", "application/x-www-form-urlencoded")
                .body("client_id=client&client_secret=secret&grant_type=client_credentials");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "access_token": access_token,
                    "expires_in": expires_in,
                    "token_type": "Bearer"
                }));
        })
        .await;
    (discovery, token)
}

/// OMF endpoint on `server` accepting every message.
pub async fn mock_omf_accepting(server: &MockServer) -> Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/omf");
            then.status(202);
        })
        .await
}
