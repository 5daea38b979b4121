//! Error types for the Astra credential exchange
//!
//! Each variant names the step that failed. None are retried internally; the
//! caller decides whether to run the whole exchange again. No variant ever
//! carries the submitted password.

use std::fmt;
use std::time::Duration;

/// Which deadline fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Waiting for a per-host connection permit.
    ConnectionPermit,
    /// Waiting for the response status line and headers.
    ResponseHeaders,
    /// The whole exchange, from permit to last body byte.
    Request,
    /// A deadline supplied by the caller.
    CallerDeadline,
}

impl TimeoutPhase {
    /// Label for logging and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            TimeoutPhase::ConnectionPermit => "connection permit",
            TimeoutPhase::ResponseHeaders => "response headers",
            TimeoutPhase::Request => "request",
            TimeoutPhase::CallerDeadline => "caller deadline",
        }
    }
}

impl fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transport-level failures: connect, TLS, deadlines, broken bodies.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("{0}")]
    Request(#[source] reqwest::Error),

    #[error("{phase} timed out after {limit:?}")]
    Timeout { phase: TimeoutPhase, limit: Duration },
}

impl NetworkError {
    pub fn is_timeout(&self) -> bool {
        match self {
            NetworkError::Request(e) => e.is_timeout(),
            NetworkError::Timeout { .. } => true,
        }
    }
}

/// Errors from building the transport or exchanging credentials.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid transport policy: {0}")]
    Config(#[from] common::Error),

    #[error("failed building HTTP transport: {0}")]
    Transport(String),

    #[error("unable to serialize credentials: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("failed creating auth request: {0}")]
    RequestConstruction(String),

    #[error("failed logging into Astra: {0}")]
    Network(#[from] NetworkError),

    #[error("unable to decode auth response (HTTP {status}): {reason}")]
    Decode { status: u16, reason: String },

    #[error("unable to find authToken in auth response (HTTP {status}): {payload}")]
    MissingToken {
        status: u16,
        /// The decoded response object, kept for diagnostics.
        payload: serde_json::Value,
    },

    #[error("authentication cancelled by caller")]
    Cancelled,
}

impl Error {
    /// Whether a deadline (transport, exchange or caller) ended the call.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Network(e) if e.is_timeout())
    }

    pub(crate) fn timeout(phase: TimeoutPhase, limit: Duration) -> Self {
        Error::Network(NetworkError::Timeout { phase, limit })
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
