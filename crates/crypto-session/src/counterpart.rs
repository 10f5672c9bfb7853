//! The remote side of the key exchange, abstracted for transports and tests

use async_trait::async_trait;
use shared_protocol::{ExchangeKeyRequest, PublicKeyResponse};
use thiserror::Error;

/// Failure reported by a counterpart implementation
#[derive(Debug, Error)]
pub enum CounterpartError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Key server operations the handshake depends on
#[async_trait]
pub trait KeyExchangeCounterpart: Send + Sync {
    /// Fetch the armored public key and a fresh session id
    async fn fetch_public_key(&self) -> Result<PublicKeyResponse, CounterpartError>;

    /// Submit the wrapped session key; `Ok` means the server accepted it
    async fn submit_wrapped_key(&self, request: &ExchangeKeyRequest)
    -> Result<(), CounterpartError>;
}
