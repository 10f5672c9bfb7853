//! Transport error types

use crypto_session::{ChannelError, CounterpartError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Secure channel error: {0}")]
    Channel(#[from] ChannelError),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<TransportError> for CounterpartError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, message } => Self::Rejected { status, message },
            TransportError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
