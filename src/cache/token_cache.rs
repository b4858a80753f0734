use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::{discover_token_endpoint, request_client_credentials_token};
use crate::cache::token::TokenRecord;
use crate::config::endpoint::{ClientCredentials, EndpointConfig};
use crate::error::{PublishError, PublishResult};
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::{Metrics, TOKEN_CACHE_HIT, TOKEN_FAILED, TOKEN_REFRESHED};
use crate::transport::HttpTransport;

type TokenSlot = Arc<Mutex<Option<TokenRecord>>>;

/// Bearer tokens keyed by endpoint name.
///
/// Every endpoint gets its own slot. The slot lock is held across a refresh,
/// so concurrent callers for one endpoint wait for the single in-flight
/// exchange and then read its result, while other endpoints are untouched.
pub struct TokenCache {
    slots: RwLock<HashMap<String, TokenSlot>>,
    clock: Arc<dyn Clock>,
    safety_margin_seconds: i64,
    metrics: Arc<Metrics>,
}

impl TokenCache {
    pub fn new(safety_margin_seconds: u64, metrics: Arc<Metrics>) -> Self {
        Self::with_clock(safety_margin_seconds, metrics, Arc::new(SystemClock))
    }

    pub fn with_clock(
        safety_margin_seconds: u64,
        metrics: Arc<Metrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            clock,
            safety_margin_seconds: safety_margin_seconds as i64,
            metrics,
        }
    }

    /// Valid bearer token for `endpoint`, refreshed through `transport` when
    /// missing or inside the safety margin. `None` for endpoints that do not
    /// authenticate.
    pub async fn get_token<T: HttpTransport>(
        &self,
        endpoint: &EndpointConfig,
        transport: &T,
    ) -> PublishResult<Option<String>> {
        let (Some(credentials), Some(discovery_url)) =
            (endpoint.credentials(), endpoint.discovery_url())
        else {
            return Ok(None);
        };

        let name = endpoint.name();
        let slot = self.slot(name).await;
        let mut record = slot.lock().await;

        if let Some(cached) = record
            .as_ref()
            .filter(|r| r.is_valid_at(self.clock.now_unix(), self.safety_margin_seconds))
        {
            debug!(endpoint = %name, expires_at = cached.expires_at_unix_ts, "using cached token");
            self.metrics.token_requests.with_label_values(&[name, TOKEN_CACHE_HIT]).inc();
            return Ok(Some(cached.access_token.clone()));
        }

        info!(endpoint = %name, "token missing or expiring, refreshing");
        match self.refresh(transport, &discovery_url, credentials).await {
            Ok(fresh) => {
                info!(endpoint = %name, expires_at = fresh.expires_at_unix_ts, "token refreshed");
                self.metrics.token_requests.with_label_values(&[name, TOKEN_REFRESHED]).inc();
                let token = fresh.access_token.clone();
                *record = Some(fresh);
                Ok(Some(token))
            }
            Err(e) => {
                warn!(endpoint = %name, error = %e, "token refresh failed");
                self.metrics.token_requests.with_label_values(&[name, TOKEN_FAILED]).inc();
                Err(e)
            }
        }
    }

    /// Current record of an endpoint, valid or not.
    pub async fn peek(&self, endpoint_name: &str) -> Option<TokenRecord> {
        let slot = self.slots.read().await.get(endpoint_name).cloned()?;
        let record = slot.lock().await;
        record.clone()
    }

    async fn refresh<T: HttpTransport>(
        &self,
        transport: &T,
        discovery_url: &str,
        credentials: &ClientCredentials,
    ) -> PublishResult<TokenRecord> {
        let token_url = discover_token_endpoint(transport, discovery_url).await?;
        let issued = request_client_credentials_token(transport, &token_url, credentials).await?;

        // sampled after the exchange, the round-trip is not validity
        let now = self.clock.now_unix();
        let expires_at = i64::try_from(issued.expires_in)
            .ok()
            .and_then(|expires_in| now.checked_add(expires_in))
            .ok_or_else(|| PublishError::auth(&token_url, "expires_in out of range"))?;
        Ok(TokenRecord::new(issued.access_token, expires_at))
    }

    async fn slot(&self, endpoint_name: &str) -> TokenSlot {
        if let Some(slot) = self.slots.read().await.get(endpoint_name) {
            return slot.clone();
        }
        self.slots
            .write()
            .await
            .entry(endpoint_name.to_owned())
            .or_default()
            .clone()
    }
}
