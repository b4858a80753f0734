//! Error taxonomy shared by every layer of the publisher.
//!
//! Configuration problems are fatal and surface before any network call.
//! Everything that happens while talking to one endpoint is captured into
//! that endpoint's `DispatchOutcome` instead of aborting the run.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// Bad or missing descriptor fields, unreadable config or payload files.
    #[error("config error: {0}")]
    Config(String),

    /// Connect, TLS, timeout or protocol-level failure of a single exchange.
    #[error("transport error for '{url}': {reason}")]
    Transport {
        url: String,
        reason: String,
        retryable: bool,
    },

    /// The identity provider's OpenID configuration could not be resolved.
    #[error("discovery error for '{url}': {reason}")]
    Discovery { url: String, reason: String },

    /// The client-credentials exchange did not yield a usable token.
    #[error("auth error for '{url}': {reason}")]
    Auth { url: String, reason: String },

    /// An OMF message was rejected by the ingestion endpoint.
    #[error("dispatch error: {message_type} message rejected by '{url}' with status {status}: {body}")]
    Dispatch {
        url: String,
        message_type: String,
        status: u16,
        body: String,
    },

    /// The task delivering to one endpoint ended without producing an outcome.
    #[error("endpoint worker aborted: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Config,
    Transport,
    Discovery,
    Auth,
    Dispatch,
    Worker,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Discovery => "discovery",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Dispatch => "dispatch",
            ErrorCategory::Worker => "worker",
        }
    }

    /// Token acquisition failures, the ones that make a run unsuccessful
    /// even in best-effort mode.
    pub fn is_token_failure(&self) -> bool {
        matches!(self, ErrorCategory::Discovery | ErrorCategory::Auth)
    }

    /// Failures that make a run unsuccessful even in best-effort mode: an
    /// endpoint without a token, or one whose worker never reported back.
    pub fn fails_best_effort_run(&self) -> bool {
        self.is_token_failure() || matches!(self, ErrorCategory::Worker)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PublishError {
    pub fn config(reason: impl Into<String>) -> Self {
        PublishError::Config(reason.into())
    }

    pub fn transport(url: impl Into<String>, reason: impl Into<String>, retryable: bool) -> Self {
        PublishError::Transport {
            url: url.into(),
            reason: reason.into(),
            retryable,
        }
    }

    pub fn discovery(url: impl Into<String>, reason: impl Into<String>) -> Self {
        PublishError::Discovery {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn auth(url: impl Into<String>, reason: impl Into<String>) -> Self {
        PublishError::Auth {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PublishError::Config(_) => ErrorCategory::Config,
            PublishError::Transport { .. } => ErrorCategory::Transport,
            PublishError::Discovery { .. } => ErrorCategory::Discovery,
            PublishError::Auth { .. } => ErrorCategory::Auth,
            PublishError::Dispatch { .. } => ErrorCategory::Dispatch,
            PublishError::Worker(_) => ErrorCategory::Worker,
        }
    }

    /// Whether the caller may try the same exchange again.
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::Transport { retryable, .. } => *retryable,
            PublishError::Dispatch { status, .. } => *status == 429 || *status >= 500,
            PublishError::Config(_)
            | PublishError::Discovery { .. }
            | PublishError::Auth { .. }
            | PublishError::Worker(_) => false,
        }
    }
}

pub type PublishResult<T> = Result<T, PublishError>;
