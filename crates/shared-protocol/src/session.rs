//! Session identifiers and channel state

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ProtocolError, ProtocolResult};

/// Opaque session token issued by the key server.
///
/// The client never interprets it; it is echoed verbatim in the key exchange
/// and in every encrypted request of the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a token received from the server, rejecting blank values
    pub fn new(value: impl Into<String>) -> ProtocolResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ProtocolError::InvalidSessionId(value));
        }
        Ok(Self(value))
    }

    /// Fresh random session id, as issued by the key server
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle of a secure channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// No handshake has completed yet
    Uninitialized,
    /// Session key acknowledged by the server
    Initialized,
    /// The last handshake attempt failed
    Failed,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the CBC initialization vector is used within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvMode {
    /// The IV agreed at handshake time is reused for every message.
    ///
    /// Identical plaintext prefixes produce identical ciphertext prefixes.
    /// Kept as the default for compatibility with counterparts that only
    /// understand the `{key, iv}` payload.
    SessionFixed,
    /// A fresh random IV is generated per message and prepended to the
    /// ciphertext.
    PerMessage,
}

impl Default for IvMode {
    fn default() -> Self {
        Self::SessionFixed
    }
}

impl std::str::FromStr for IvMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "session_fixed" | "fixed" => Ok(Self::SessionFixed),
            "per_message" => Ok(Self::PerMessage),
            other => Err(ProtocolError::UnknownIvMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_rejects_blank() {
        assert!(SessionId::new("   ").is_err());
        assert_eq!(SessionId::new("sess-123").unwrap().as_str(), "sess-123");
    }

    #[test]
    fn test_generated_ids_are_unique_uuids() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_session_id_is_transparent_on_the_wire() {
        let id = SessionId::new("sess-123").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sess-123\"");
    }

    #[test]
    fn test_iv_mode_parsing() {
        assert_eq!("per-message".parse::<IvMode>().unwrap(), IvMode::PerMessage);
        assert_eq!("FIXED".parse::<IvMode>().unwrap(), IvMode::SessionFixed);
        assert!("gcm".parse::<IvMode>().is_err());
    }
}
