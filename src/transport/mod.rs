/// Transport module
///
/// One request/response exchange per call. Callers decide TLS verification
/// and timeouts when they build a transport; the exchange itself only moves
/// bytes and classifies failures.
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{PublishError, PublishResult};

pub mod reqwest_transport;
pub mod target;

pub use reqwest_transport::{ReqwestTransport, TlsPolicy};
pub use target::RequestTarget;

pub trait HttpTransport {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl std::future::Future<Output = PublishResult<TransportResponse>> + Send;
}

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub url: String,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Lossy text of the body, for error reports.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> PublishResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            PublishError::transport(
                &self.url,
                format!("response body is not the expected JSON: {}", e),
                false,
            )
        })
    }
}
