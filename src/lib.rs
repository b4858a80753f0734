//! # OMF Publisher Library
//!
//! Publishes OMF type, container and data messages to one or more
//! ingestion endpoints (OCS, EDS, PI), authenticating OCS endpoints with
//! cached OAuth2 client-credentials tokens.
//!
//! Modules:
//! - `config`: endpoint descriptors, normalization, settings, loading
//! - `cache`: per-endpoint bearer token cache
//! - `auth`: OpenID discovery and client-credentials exchange
//! - `transport`: one HTTPS request/response exchange per call
//! - `omf`: OMF messages, payload files, request headers
//! - `dispatch`: fan-out to endpoints and per-endpoint outcomes

pub mod auth;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod omf;
pub mod resilience;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::error::{ErrorCategory, PublishError, PublishResult};
