use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PublishError, PublishResult};
use crate::transport::{HttpTransport, TransportRequest};

#[derive(Debug, Deserialize)]
struct OpenIdConfiguration {
    token_endpoint: Option<String>,
}

/// Resolve the token endpoint from the identity provider's OpenID
/// configuration document.
pub async fn discover_token_endpoint<T: HttpTransport>(
    transport: &T,
    discovery_url: &str,
) -> PublishResult<String> {
    let request = TransportRequest::get(discovery_url).header("Accept", "application/json");

    let response = transport
        .send(request)
        .await
        .map_err(|e| PublishError::discovery(discovery_url, e.to_string()))?;

    if !response.is_success() {
        warn!(url = %discovery_url, status = response.status.as_u16(), "discovery request rejected");
        return Err(PublishError::discovery(
            discovery_url,
            format!("unexpected status {}", response.status),
        ));
    }

    let configuration: OpenIdConfiguration = response
        .json()
        .map_err(|e| PublishError::discovery(discovery_url, e.to_string()))?;

    let token_endpoint = configuration
        .token_endpoint
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| PublishError::discovery(discovery_url, "response has no 'token_endpoint'"))?;

    debug!(url = %discovery_url, token_endpoint = %token_endpoint, "token endpoint discovered");
    Ok(token_endpoint)
}
