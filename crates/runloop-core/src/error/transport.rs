//! Errors raised by a [`RunTransport`](crate::transport::RunTransport).

use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Failures talking to the remote assistant service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Remote answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection could not be established or was dropped
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Response was well-formed HTTP but not what the protocol promises
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    /// No API key in the explicit value, environment or config file
    #[error("No API key configured (set OPENAI_API_KEY or openai.api_key in runloop.toml)")]
    MissingApiKey,

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Model cannot produce JSON-schema constrained output
    #[error("Model {model} does not support JSON schema response formats")]
    UnsupportedModel { model: String },
}

impl TransportError {
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            message: message.into(),
        }
    }

    /// Check if repeating the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Connection { .. } | TransportError::Timeout { .. } => true,
            TransportError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Short machine-readable label used in logs
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::Http { .. } => "http",
            TransportError::Connection { .. } => "connection",
            TransportError::Protocol { .. } => "protocol",
            TransportError::Serialization { .. } => "serialization",
            TransportError::InvalidUrl { .. } => "invalid_url",
            TransportError::MissingApiKey => "missing_api_key",
            TransportError::Timeout { .. } => "timeout",
            TransportError::UnsupportedModel { .. } => "unsupported_model",
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<url::ParseError> for TransportError {
    fn from(err: url::ParseError) -> Self {
        Self::invalid_url(err.to_string())
    }
}
