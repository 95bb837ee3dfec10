//! Error types for the orsclient core library
//!
//! Every failure a [`Client`](crate::Client) can report is one of the
//! variants below. Callers match on [`Error::kind`] or use the policy helpers
//! ([`Error::is_retryable`], [`Error::aborts_batch`]) instead of inspecting
//! HTTP details themselves.

use std::fmt;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Main error type for routing-service requests
#[derive(Error, Debug)]
pub enum Error {
    /// No usable credential for the target origin, or an unusable provider setup
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The overall per-call time budget elapsed
    #[error("Request timed out after {elapsed:?} (budget {budget:?})")]
    Timeout {
        elapsed: Duration,
        budget: Duration,
    },

    /// The network layer itself failed (DNS, TLS, refused or reset connection)
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// HTTP 403: the credential was rejected
    #[error("Invalid API key: {message}")]
    InvalidKey { message: String },

    /// HTTP 429: retried automatically until the time budget runs out
    #[error("Rate limit exceeded: {message}")]
    OverQueryLimit { message: String },

    /// Any other 4xx, carrying the server-supplied payload
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<Value>,
    },

    /// 5xx or any unrecognized non-200 status
    #[error("Server error {status}: {message}")]
    GenericServer { status: u16, message: String },

    /// The caller cancelled the request before it reached a terminal outcome
    #[error("Request cancelled")]
    Cancelled,

    /// A 200 response whose body was not valid JSON
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors (configuration files)
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of [`Error`], for reporting and policy decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Configuration,
    Timeout,
    Transport,
    InvalidKey,
    OverQueryLimit,
    Api,
    GenericServer,
    Cancelled,
    Json,
    Io,
}

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error wrapping the underlying failure
    pub fn transport<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::InvalidKey { .. } => ErrorKind::InvalidKey,
            Self::OverQueryLimit { .. } => ErrorKind::OverQueryLimit,
            Self::Api { .. } => ErrorKind::Api,
            Self::GenericServer { .. } => ErrorKind::GenericServer,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Json { .. } => ErrorKind::Json,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Whether the client retries this condition on its own
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OverQueryLimit { .. })
    }

    /// Whether a batch over many items should stop instead of moving on
    ///
    /// These kinds mean the whole provider is unreachable or misconfigured,
    /// so every remaining item would fail the same way.
    pub fn aborts_batch(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Configuration { .. } | Self::Cancelled
        )
    }

    /// HTTP status associated with this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::InvalidKey { .. } => Some(403),
            Self::OverQueryLimit { .. } => Some(429),
            Self::Api { status, .. } | Self::GenericServer { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "ConfigurationError"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::Transport => write!(f, "TransportError"),
            ErrorKind::InvalidKey => write!(f, "InvalidKey"),
            ErrorKind::OverQueryLimit => write!(f, "OverQueryLimit"),
            ErrorKind::Api => write!(f, "ApiError"),
            ErrorKind::GenericServer => write!(f, "GenericServerError"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::Json => write!(f, "JsonError"),
            ErrorKind::Io => write!(f, "IoError"),
        }
    }
}
