//! OMF messages and the ingestion request built for each of them.
//!
//! Message bodies are opaque: they keep the exact text they were read with,
//! only the headers depend on the message type and the endpoint.

use std::fmt;

use serde_json::value::RawValue;

use crate::config::endpoint::EndpointConfig;
use crate::error::{PublishError, PublishResult};
use crate::transport::TransportRequest;

pub mod compression;
pub mod payload;

pub const OMF_VERSION: &str = "1.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OmfMessageType {
    Type,
    Container,
    Data,
}

impl OmfMessageType {
    /// Value of the `messagetype` header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            OmfMessageType::Type => "type",
            OmfMessageType::Container => "container",
            OmfMessageType::Data => "data",
        }
    }
}

impl fmt::Display for OmfMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OmfMessageType::Type => "Type",
            OmfMessageType::Container => "Container",
            OmfMessageType::Data => "Data",
        })
    }
}

#[derive(Debug, Clone)]
pub struct OmfMessage {
    pub message_type: OmfMessageType,
    pub body: Box<RawValue>,
}

impl OmfMessage {
    pub fn new(message_type: OmfMessageType, body: Box<RawValue>) -> Self {
        Self { message_type, body }
    }

    /// Message from a single JSON document, kept as written.
    pub fn from_json(message_type: OmfMessageType, body: impl Into<String>) -> PublishResult<Self> {
        let body = RawValue::from_string(body.into()).map_err(|e| {
            PublishError::config(format!("{} message is not valid JSON: {}", message_type, e))
        })?;
        Ok(Self::new(message_type, body))
    }

    pub fn body_text(&self) -> &str {
        self.body.get()
    }
}

/// POST of `message` to the endpoint's OMF url.
pub fn build_omf_request(
    endpoint: &EndpointConfig,
    message: &OmfMessage,
    bearer_token: Option<&str>,
) -> PublishResult<TransportRequest> {
    let body = message.body_text().as_bytes();

    let mut request = TransportRequest::post(endpoint.omf_endpoint())
        .header("messagetype", message.message_type.as_header_value())
        .header("action", "create")
        .header("messageformat", "JSON")
        .header("omfversion", OMF_VERSION)
        .header("Content-Type", "application/json");

    if let Some(token) = bearer_token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }

    request = if endpoint.use_compression() {
        request
            .header("compression", "gzip")
            .body(compression::gzip(body)?)
    } else {
        request.body(body)
    };

    Ok(request)
}
