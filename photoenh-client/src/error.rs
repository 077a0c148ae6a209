//! Error types for photoenh-client
//!
//! Every failure a collaborator call can produce maps onto one variant here.
//! None of them is fatal to the session: callers log, leave state untouched,
//! and let the user retry.

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connection refused, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status or `success: false`
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Checkout session could not be created
    #[error("Payment error: {0}")]
    Checkout(String),

    /// Enhanced asset could not be saved
    #[error("Download error: {0}")]
    Download(String),

    /// Operation not valid for the current display source
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// photoenh-common error
    #[error("Common error: {0}")]
    Common(#[from] photoenh_common::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
