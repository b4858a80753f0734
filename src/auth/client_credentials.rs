use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::endpoint::ClientCredentials;
use crate::error::{PublishError, PublishResult};
use crate::transport::{HttpTransport, TransportRequest};

static GRANT_TYPE: &str = "client_credentials";

/// Successful token endpoint answer.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Form body of the client-credentials grant.
pub fn token_request_form(credentials: &ClientCredentials) -> String {
    [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", GRANT_TYPE),
    ]
    .iter()
    .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
    .collect::<Vec<_>>()
    .join("&")
}

pub async fn request_client_credentials_token<T: HttpTransport>(
    transport: &T,
    token_url: &str,
    credentials: &ClientCredentials,
) -> PublishResult<IssuedToken> {
    let request = TransportRequest::post(token_url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Accept", "*/*")
        .body(token_request_form(credentials));

    let response = transport
        .send(request)
        .await
        .map_err(|e| PublishError::auth(token_url, e.to_string()))?;

    if !response.is_success() {
        warn!(url = %token_url, status = response.status.as_u16(), "token request rejected");
        return Err(PublishError::auth(
            token_url,
            format!("unexpected status {}", response.status),
        ));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|e| PublishError::auth(token_url, e.to_string()))?;

    let access_token = token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PublishError::auth(token_url, "response has no 'access_token'"))?;
    let expires_in = token
        .expires_in
        .ok_or_else(|| PublishError::auth(token_url, "response has no 'expires_in'"))?;

    debug!(url = %token_url, expires_in, "token issued");
    Ok(IssuedToken {
        access_token,
        expires_in,
    })
}
