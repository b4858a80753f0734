//! OAuth2 client-credentials flow against the OCS identity provider.

pub mod client_credentials;
pub mod discovery;

pub use client_credentials::{request_client_credentials_token, IssuedToken};
pub use discovery::discover_token_endpoint;
