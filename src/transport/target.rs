use reqwest::Url;

use crate::error::{PublishError, PublishResult};

/// Where a single exchange goes: host, port and path split out of a url.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// everything after the host, query included, always starting with '/'
    pub path: String,
}

impl RequestTarget {
    pub fn parse(url: &str) -> PublishResult<Self> {
        let parsed = Url::parse(url)
            .map_err(|e| PublishError::transport(url, format!("malformed url: {}", e), false))?;

        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| PublishError::transport(url, "malformed url: no host", false))?
            .to_owned();

        let port = match (parsed.port(), parsed.scheme()) {
            (Some(port), _) => port,
            (None, "http") => 80,
            (None, _) => 443,
        };

        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_owned(),
        };

        Ok(Self {
            scheme: parsed.scheme().to_owned(),
            host,
            port,
            path,
        })
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == "https"
    }
}
