//! Network Transport - HTTP client side of the SecureLink key server API
//!
//! Implements the key exchange counterpart over JSON/HTTP and the
//! steady-state encrypted request/response exchange.

mod error;
mod http;

pub use error::*;
pub use http::*;

/// Default key server address
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
