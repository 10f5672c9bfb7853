//! JSON wire messages exchanged with the key server

use serde::{Deserialize, Serialize};

use crate::{IvMode, ProtocolError, ProtocolResult, SessionId};

/// Response of the public key endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// RSA public key, armored SubjectPublicKeyInfo
    pub public_key: String,
    /// Session token correlating the later key submission
    pub session_id: String,
}

impl PublicKeyResponse {
    /// Check that both fields carry content
    pub fn validate(&self) -> ProtocolResult<SessionId> {
        if self.public_key.trim().is_empty() {
            return Err(ProtocolError::MissingField("public_key"));
        }
        SessionId::new(self.session_id.clone())
    }
}

/// Submission of the wrapped session key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeKeyRequest {
    /// Base64 of the RSA-OAEP encrypted [`WrappedKeyPayload`]
    #[serde(default)]
    pub encrypted_key: String,
    #[serde(default)]
    pub session_id: String,
}

impl ExchangeKeyRequest {
    pub fn new(encrypted_key: String, session_id: &SessionId) -> Self {
        Self {
            encrypted_key,
            session_id: session_id.as_str().to_string(),
        }
    }

    /// Both fields are required by the server
    pub fn validate(&self) -> ProtocolResult<SessionId> {
        if self.encrypted_key.is_empty() {
            return Err(ProtocolError::MissingField("encrypted_key"));
        }
        if self.session_id.is_empty() {
            return Err(ProtocolError::MissingField("session_id"));
        }
        SessionId::new(self.session_id.clone())
    }
}

/// Acknowledgment of a successful key exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeKeyResponse {
    pub status: String,
}

impl ExchangeKeyResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Session key material as it travels inside the RSA envelope.
///
/// `key` and `iv` are base64 text. `iv_mode` is omitted for the session-fixed
/// mode so the payload stays the plain `{key, iv}` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyPayload {
    pub key: String,
    pub iv: String,
    #[serde(default, skip_serializing_if = "is_session_fixed")]
    pub iv_mode: IvMode,
}

fn is_session_fixed(mode: &IvMode) -> bool {
    *mode == IvMode::SessionFixed
}

impl WrappedKeyPayload {
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> ProtocolResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Steady-state request carrying an encrypted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRequest {
    /// Base64 ciphertext, absent for plaintext requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl EncryptedRequest {
    pub fn new(encrypted_data: String, session_id: &SessionId) -> Self {
        Self {
            encrypted_data: Some(encrypted_data),
            session_id: Some(session_id.as_str().to_string()),
        }
    }
}

/// Steady-state response carrying an encrypted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedResponse {
    pub encrypted_data: String,
}

/// Error body returned by the key server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
