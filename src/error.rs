//! Error types for the gateway client

use std::sync::Arc;

use thiserror::Error;

use crate::types::identifiers::DocumentId;

/// HTTP status the backend uses to signal an expired or missing session
pub const UNAUTHORIZED: u16 = 401;

/// Main error type for the gateway client
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Connection-level failure (DNS, refused connection, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Backend `detail` message, or the raw body when there is none
        message: String,
    },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request was rejected again after a successful session refresh
    #[error("Authentication rejected after session refresh: {0}")]
    AuthRejected(String),

    /// Session refresh failed; shared by every request waiting on it
    #[error("Session refresh failed: {0}")]
    RefreshFailed(#[source] Arc<GatewayError>),

    /// Document did not reach a terminal status before the poll timeout
    #[error("Polling timeout: document {document_id} still processing after {elapsed_ms} ms")]
    PollTimeout {
        /// Document being polled
        document_id: DocumentId,
        /// Wall-clock time since the upload started
        elapsed_ms: u64,
    },

    /// Backend finished processing the document with an error
    #[error("Processing failed for document {document_id}: {reason}")]
    ProcessingFailed {
        /// Failed document
        document_id: DocumentId,
        /// Error reported by the backend
        reason: String,
    },

    /// Operation cancelled by the caller
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Internal channel closed (coordinator or driver task gone)
    #[error("Channel closed: {0}")]
    Closed(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for gateway client operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Coarse failure category, used to pick user guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Credentials are gone; the user has to sign in again
    Auth,
    /// Network, HTTP or decoding problem; retrying now may help
    Transport,
    /// Backend is still working; come back later
    Timeout,
    /// Backend rejected the input; the file needs fixing
    Processing,
    /// Caller gave up on purpose
    Cancelled,
}

impl GatewayError {
    /// Create a network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create an HTTP status error
    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: msg.into(),
        }
    }

    /// Create a parse error from a message
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(serde_json::Error::io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            msg.into(),
        )))
    }

    /// Create an auth-rejected error
    pub fn auth_rejected(msg: impl Into<String>) -> Self {
        Self::AuthRejected(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a closed-channel error
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::Closed(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this failure should start the session refresh path
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Http { status, .. } if *status == UNAUTHORIZED)
    }

    /// Classify the failure for user-facing reporting
    #[must_use]
    pub fn failure_cause(&self) -> FailureCause {
        match self {
            Self::AuthRejected(_) | Self::RefreshFailed(_) => FailureCause::Auth,
            Self::Http { status, .. } if *status == UNAUTHORIZED => FailureCause::Auth,
            Self::PollTimeout { .. } => FailureCause::Timeout,
            Self::ProcessingFailed { .. } => FailureCause::Processing,
            Self::Cancelled(_) => FailureCause::Cancelled,
            Self::Network(_)
            | Self::Http { .. }
            | Self::Parse(_)
            | Self::Closed(_)
            | Self::Io(_)
            | Self::InvalidConfig(_) => FailureCause::Transport,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::http(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::parse(err.to_string());
        }
        if err.is_builder() {
            return Self::invalid_config(err.to_string());
        }
        Self::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_401_is_auth_failure() {
        assert!(GatewayError::http(401, "expired").is_auth_failure());
        assert!(!GatewayError::http(403, "forbidden").is_auth_failure());
        assert!(!GatewayError::network("reset").is_auth_failure());
    }

    #[test]
    fn test_failure_causes_stay_distinct() {
        let timeout = GatewayError::PollTimeout {
            document_id: DocumentId::new(1),
            elapsed_ms: 120_000,
        };
        let processing = GatewayError::ProcessingFailed {
            document_id: DocumentId::new(1),
            reason: "unsupported pdf".into(),
        };
        let transport = GatewayError::http(502, "bad gateway");

        assert_eq!(timeout.failure_cause(), FailureCause::Timeout);
        assert_eq!(processing.failure_cause(), FailureCause::Processing);
        assert_eq!(transport.failure_cause(), FailureCause::Transport);
        assert_eq!(
            GatewayError::RefreshFailed(Arc::new(GatewayError::http(401, "gone")))
                .failure_cause(),
            FailureCause::Auth
        );
    }

    #[test]
    fn test_reqwest_builder_error_is_invalid_config() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let mapped = GatewayError::from(err);
        assert!(matches!(mapped, GatewayError::InvalidConfig(_)));
        assert_eq!(mapped.failure_cause(), FailureCause::Transport);
    }
}
