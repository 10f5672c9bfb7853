//! Crypto Session - Hybrid key exchange and session encryption for SecureLink
//!
//! The client wraps a fresh AES-256 key and IV under the server's RSA public
//! key (OAEP, SHA-256), and encrypts every later payload with AES-256-CBC
//! under that key.

mod channel;
mod cipher;
mod counterpart;
pub mod encoding;
mod error;
mod handshake;
mod keys;
mod persist;
mod wrap;

pub use channel::*;
pub use cipher::*;
pub use counterpart::*;
pub use error::*;
pub use handshake::*;
pub use keys::*;
pub use persist::*;
pub use wrap::*;

pub use shared_protocol::{ChannelState, IvMode, SessionId};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
