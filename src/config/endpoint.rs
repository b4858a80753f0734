//! Endpoint descriptors and their normalized form.
//!
//! A raw descriptor is what the configuration file holds. Normalization
//! validates the fields the endpoint kind requires and derives the base and
//! OMF urls once; the resulting [`EndpointConfig`] is an immutable value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PublishError, PublishResult};

pub const TYPE_OCS: &str = "OCS";
pub const TYPE_EDS: &str = "EDS";
pub const TYPE_PI: &str = "PI";

const OPENID_CONFIGURATION_PATH: &str = "/identity/.well-known/openid-configuration";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Ocs,
    Eds,
    Pi,
}

impl EndpointKind {
    pub fn parse(value: &str) -> Option<Self> {
        [EndpointKind::Ocs, EndpointKind::Eds, EndpointKind::Pi]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Ocs => TYPE_OCS,
            EndpointKind::Eds => TYPE_EDS,
            EndpointKind::Pi => TYPE_PI,
        }
    }

    /// Only OCS endpoints authenticate with a bearer token.
    pub fn requires_token(&self) -> bool {
        matches!(self, EndpointKind::Ocs)
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ================================
/// Raw descriptor, as found in the `endpoints` array
/// ================================
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawEndpointDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_compression: Option<bool>,
    /// derived on normalization, accepted and ignored on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_endpoint: Option<String>,
    /// derived on normalization, accepted and ignored on input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub omf_endpoint: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}

/// Normalized endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    name: String,
    kind: EndpointKind,
    resource: String,
    api_version: Option<String>,
    tenant: Option<String>,
    namespace_name: Option<String>,
    credentials: Option<ClientCredentials>,
    base_endpoint: String,
    omf_endpoint: String,
    verify_ssl: bool,
    use_compression: bool,
}

impl EndpointConfig {
    /// Validate `raw` and derive the urls. `index` names unnamed endpoints.
    pub fn normalize(raw: &RawEndpointDescriptor, index: usize) -> PublishResult<Self> {
        let name = raw
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| format!("endpoint-{}", index));

        let kind_value = raw
            .endpoint_type
            .as_deref()
            .ok_or_else(|| missing(&name, "endpoint_type"))?;
        let kind = EndpointKind::parse(kind_value).ok_or_else(|| {
            PublishError::config(format!(
                "endpoint '{}': unsupported endpoint_type '{}', expected one of {}, {}, {}",
                name, kind_value, TYPE_OCS, TYPE_EDS, TYPE_PI
            ))
        })?;

        let resource = required(&name, "resource", &raw.resource)?
            .trim_end_matches('/')
            .to_owned();

        let (api_version, tenant, namespace_name, credentials, base_endpoint) = match kind {
            EndpointKind::Ocs => {
                let api_version = required(&name, "api_version", &raw.api_version)?;
                let tenant = required(&name, "tenant", &raw.tenant)?;
                let namespace_name = required(&name, "namespace_name", &raw.namespace_name)?;
                let credentials = ClientCredentials {
                    client_id: required(&name, "client_id", &raw.client_id)?,
                    client_secret: required(&name, "client_secret", &raw.client_secret)?,
                };
                let base_endpoint = format!(
                    "{}/api/{}/tenants/{}/namespaces/{}",
                    resource, api_version, tenant, namespace_name
                );
                (
                    Some(api_version),
                    Some(tenant),
                    Some(namespace_name),
                    Some(credentials),
                    base_endpoint,
                )
            }
            EndpointKind::Eds => {
                let api_version = required(&name, "api_version", &raw.api_version)?;
                let base_endpoint = format!(
                    "{}/api/{}/tenants/default/namespaces/default",
                    resource, api_version
                );
                (Some(api_version), None, None, None, base_endpoint)
            }
            EndpointKind::Pi => (None, None, None, None, resource.clone()),
        };

        let omf_endpoint = format!("{}/omf", resource);

        Ok(Self {
            name,
            kind,
            resource,
            api_version,
            tenant,
            namespace_name,
            credentials,
            base_endpoint,
            omf_endpoint,
            // each flag defaults only when its own field is absent
            verify_ssl: raw.verify_ssl.unwrap_or(true),
            use_compression: raw.use_compression.unwrap_or(false),
        })
    }

    /// Descriptor carrying every field, derived ones included.
    pub fn to_descriptor(&self) -> RawEndpointDescriptor {
        RawEndpointDescriptor {
            name: Some(self.name.clone()),
            endpoint_type: Some(self.kind.as_str().to_owned()),
            resource: Some(self.resource.clone()),
            api_version: self.api_version.clone(),
            tenant: self.tenant.clone(),
            namespace_name: self.namespace_name.clone(),
            client_id: self.credentials.as_ref().map(|c| c.client_id.clone()),
            client_secret: self.credentials.as_ref().map(|c| c.client_secret.clone()),
            verify_ssl: Some(self.verify_ssl),
            use_compression: Some(self.use_compression),
            base_endpoint: Some(self.base_endpoint.clone()),
            omf_endpoint: Some(self.omf_endpoint.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace_name.as_deref()
    }

    /// Present for OCS endpoints only.
    pub fn credentials(&self) -> Option<&ClientCredentials> {
        self.credentials.as_ref()
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    pub fn omf_endpoint(&self) -> &str {
        &self.omf_endpoint
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn use_compression(&self) -> bool {
        self.use_compression
    }

    /// Well-known OpenID configuration document of the identity provider.
    pub fn discovery_url(&self) -> Option<String> {
        self.kind
            .requires_token()
            .then(|| format!("{}{}", self.resource, OPENID_CONFIGURATION_PATH))
    }
}

fn missing(endpoint: &str, field: &str) -> PublishError {
    PublishError::config(format!("endpoint '{}': missing required field '{}'", endpoint, field))
}

fn required(endpoint: &str, field: &str, value: &Option<String>) -> PublishResult<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| missing(endpoint, field))
}
