//! Crypto session error types

use shared_protocol::{ChannelState, ProtocolError};
use thiserror::Error;

use crate::CounterpartError;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid base64 text: {0}")]
    Decode(String),

    #[error("Invalid key format: {0}")]
    KeyFormat(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Key wrapping failed: {0}")]
    KeyWrap(String),

    #[error("Key unwrapping failed: {0}")]
    KeyUnwrap(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: bad key, padding or length")]
    DecryptionFailed,

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid IV length: expected {expected}, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] ProtocolError),
}

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Handshake failure. Every variant leaves the channel in `Failed`.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Failed to fetch server public key: {0}")]
    KeyFetchFailed(String),

    #[error("Server public key rejected: {0}")]
    KeyFormat(String),

    #[error("Invalid encoded data: {0}")]
    Decode(String),

    #[error("Key exchange rejected: {0}")]
    ExchangeRejected(String),

    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}

impl From<CryptoError> for HandshakeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decode(msg) => Self::Decode(msg),
            CryptoError::KeyFormat(msg) => Self::KeyFormat(msg),
            other => Self::Crypto(other),
        }
    }
}

impl HandshakeError {
    pub(crate) fn fetch(err: CounterpartError) -> Self {
        Self::KeyFetchFailed(err.to_string())
    }

    pub(crate) fn rejected(err: CounterpartError) -> Self {
        Self::ExchangeRejected(err.to_string())
    }
}

pub type HandshakeResult<T> = Result<T, HandshakeError>;

/// Per-call channel error. None of these change the channel state.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Secure channel not initialized (state: {0})")]
    NotInitialized(ChannelState),

    #[error("Invalid ciphertext encoding: {0}")]
    Decode(String),

    #[error("Decryption failed")]
    DecryptFailed,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<CryptoError> for ChannelError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decode(msg) => Self::Decode(msg),
            CryptoError::DecryptionFailed => Self::DecryptFailed,
            other => Self::Encryption(other.to_string()),
        }
    }
}

pub type ChannelResult<T> = Result<T, ChannelError>;
