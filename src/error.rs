//! Error types for the TokiPay client

use crate::types::Operation;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for TokiPay operations
pub type Result<T> = std::result::Result<T, TokiPayError>;

/// Main error type for TokiPay operations
#[derive(Error, Debug)]
pub enum TokiPayError {
    /// HTTP transport error (connection, DNS, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Request body could not be encoded
    #[error("Failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Response body was not a valid envelope
    #[error("Failed to decode {operation} response: {source}")]
    Deserialization {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    /// The token endpoint rejected the credentials
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The provider answered with a non-success envelope code
    #[error("{operation} failed: {message}")]
    Api {
        operation: Operation,
        code: i32,
        message: String,
    },

    /// Success envelope without a payload
    #[error("{operation} succeeded without a data payload")]
    MissingData { operation: Operation },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Inbound callback could not be accepted
    #[error("Invalid callback: {message}")]
    InvalidCallback { message: String },
}

impl TokiPayError {
    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create an API error for a rejected operation
    pub fn api(operation: Operation, code: i32, message: impl Into<String>) -> Self {
        Self::Api {
            operation,
            code,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid callback error
    pub fn invalid_callback(message: impl Into<String>) -> Self {
        Self::InvalidCallback {
            message: message.into(),
        }
    }

    /// Map a transport failure, separating out timeouts
    pub(crate) fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout }
        } else {
            Self::Http(err)
        }
    }

    /// Whether the failure was caused by the request timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// The provider's own error text, if the provider rejected the call
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            Self::Authentication { message } | Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}
