//! Shared Protocol Definitions for SecureLink
//!
//! This crate contains the JSON wire messages, session identifiers and
//! channel states shared by the client and the key server.

mod error;
mod messages;
mod session;

pub use error::*;
pub use messages::*;
pub use session::*;

/// Endpoint returning the server public key and a fresh session id
pub const PUBLIC_KEY_PATH: &str = "/api/get_public_key";

/// Endpoint accepting the wrapped session key
pub const EXCHANGE_KEY_PATH: &str = "/api/exchange_key";

/// Endpoint echoing an encrypted payload back under the session key
pub const SECURE_ECHO_PATH: &str = "/api/secure_echo";

/// Symmetric session key size (256 bits / 32 bytes)
pub const SESSION_KEY_SIZE: usize = 32;

/// Initialization vector size (128 bits / 16 bytes)
pub const IV_SIZE: usize = 16;

/// Default lifetime of an established session on the server, in seconds
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
