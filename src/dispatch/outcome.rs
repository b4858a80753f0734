use tracing::{error, info};

use crate::error::{ErrorCategory, PublishError};

/// Result of delivering the message set to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub endpoint_index: usize,
    pub endpoint_name: String,
    pub success: bool,
    pub messages_sent: usize,
    pub error_category: Option<ErrorCategory>,
    /// first error met on this endpoint
    pub error_detail: Option<String>,
}

impl DispatchOutcome {
    pub fn succeeded(endpoint_index: usize, endpoint_name: &str, messages_sent: usize) -> Self {
        Self {
            endpoint_index,
            endpoint_name: endpoint_name.to_owned(),
            success: true,
            messages_sent,
            error_category: None,
            error_detail: None,
        }
    }

    pub fn failed(
        endpoint_index: usize,
        endpoint_name: &str,
        messages_sent: usize,
        error: &PublishError,
    ) -> Self {
        Self {
            endpoint_index,
            endpoint_name: endpoint_name.to_owned(),
            success: false,
            messages_sent,
            error_category: Some(error.category()),
            error_detail: Some(error.to_string()),
        }
    }
}

/// End-of-run view over every endpoint's outcome.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchSummary {
    pub fn new(outcomes: Vec<DispatchOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    /// Endpoints whose bearer token could not be obtained.
    pub fn token_failures(&self) -> impl Iterator<Item = &DispatchOutcome> {
        self.failed().filter(|o| {
            o.error_category
                .map(|category| category.is_token_failure())
                .unwrap_or(false)
        })
    }

    /// Best effort fails the run only on token failures and aborted workers;
    /// strict on any failure.
    pub fn is_run_failure(&self, strict: bool) -> bool {
        if strict {
            !self.all_succeeded()
        } else {
            self.failed().any(|o| {
                o.error_category
                    .map(|category| category.fails_best_effort_run())
                    .unwrap_or(true)
            })
        }
    }

    pub fn log(&self) {
        for outcome in &self.outcomes {
            if outcome.success {
                info!(
                    endpoint = %outcome.endpoint_name,
                    index = outcome.endpoint_index,
                    messages = outcome.messages_sent,
                    "endpoint succeeded"
                );
            } else {
                error!(
                    endpoint = %outcome.endpoint_name,
                    index = outcome.endpoint_index,
                    messages = outcome.messages_sent,
                    category = %outcome.error_category.map(|c| c.as_str()).unwrap_or("unknown"),
                    error = %outcome.error_detail.as_deref().unwrap_or(""),
                    "endpoint failed"
                );
            }
        }
        info!(
            total = self.outcomes.len(),
            failed = self.failed().count(),
            "dispatch finished"
        );
    }
}
