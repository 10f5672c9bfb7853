//! Secure channel: per-session symmetric encryption after the handshake

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use shared_protocol::{ChannelState, IvMode, SessionId};
use tracing::{debug, info};

use crate::encoding::{bytes_to_text, text_to_bytes};
use crate::{ChannelError, ChannelResult, SessionCipher};

/// Anything the caller hands to [`SecureChannel::encrypt`]
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, encrypted as-is
    Bytes(Bytes),
    /// Text, encrypted as its UTF-8 bytes
    Text(String),
    /// Structured value, serialized to JSON text first
    Structured(Value),
}

impl Payload {
    fn into_plaintext(self) -> ChannelResult<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.to_vec()),
            Self::Text(text) => Ok(text.into_bytes()),
            Self::Structured(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

/// Result of a successful decryption
#[derive(Debug, Clone, PartialEq)]
pub enum Decrypted {
    /// The plaintext parsed as JSON
    Structured(Value),
    /// UTF-8 text that is not JSON
    Text(String),
    /// Plaintext that is not valid UTF-8
    Bytes(Vec<u8>),
}

impl Decrypted {
    fn from_plaintext(plaintext: Vec<u8>) -> Self {
        match String::from_utf8(plaintext) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => Self::Structured(value),
                Err(_) => Self::Text(text),
            },
            Err(err) => Self::Bytes(err.into_bytes()),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Turn the result back into something encryptable
    pub fn into_payload(self) -> Payload {
        match self {
            Self::Structured(value) => Payload::Structured(value),
            Self::Text(text) => Payload::Text(text),
            Self::Bytes(bytes) => Payload::Bytes(Bytes::from(bytes)),
        }
    }
}

impl std::fmt::Display for Decrypted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Encrypt a payload under a session cipher and return base64 text
pub fn seal_payload(cipher: &SessionCipher, payload: impl Into<Payload>) -> ChannelResult<String> {
    let plaintext = payload.into().into_plaintext()?;
    let ciphertext = cipher.encrypt(&plaintext)?;
    Ok(bytes_to_text(&ciphertext))
}

/// Decode and decrypt base64 ciphertext under a session cipher
pub fn open_payload(cipher: &SessionCipher, cipher_text: &str) -> ChannelResult<Decrypted> {
    let ciphertext = text_to_bytes(cipher_text)?;
    let plaintext = cipher.decrypt(&ciphertext)?;
    Ok(Decrypted::from_plaintext(plaintext))
}

/// Key material adopted after a successful handshake
struct Established {
    cipher: SessionCipher,
    session_id: SessionId,
}

#[derive(Default)]
struct ChannelInner {
    state: ChannelState,
    established: Option<Arc<Established>>,
}

/// Encrypts and decrypts payloads for one session.
///
/// Constructed per session and shared by `Arc`; the key material is
/// written once by the handshake and only read afterwards, so `encrypt` and
/// `decrypt` can run concurrently.
#[derive(Default)]
pub struct SecureChannel {
    inner: RwLock<ChannelInner>,
}

impl SecureChannel {
    /// Create an uninitialized channel
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ChannelState {
        self.inner.read().state
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == ChannelState::Initialized
    }

    /// Session id, once initialized
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner
            .read()
            .established
            .as_ref()
            .map(|e| e.session_id.clone())
    }

    /// IV handling agreed at handshake time, once initialized
    pub fn iv_mode(&self) -> Option<IvMode> {
        self.inner
            .read()
            .established
            .as_ref()
            .map(|e| e.cipher.iv_mode())
    }

    /// Drop any key material and return to `Uninitialized`
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.established = None;
        inner.state = ChannelState::Uninitialized;
        debug!("Secure channel reset");
    }

    pub(crate) fn adopt(&self, cipher: SessionCipher, session_id: SessionId) {
        let mut inner = self.inner.write();
        info!("Secure channel initialized for session {}", session_id);
        inner.established = Some(Arc::new(Established { cipher, session_id }));
        inner.state = ChannelState::Initialized;
    }

    pub(crate) fn mark_failed(&self) {
        let mut inner = self.inner.write();
        inner.established = None;
        inner.state = ChannelState::Failed;
    }

    fn established(&self) -> ChannelResult<Arc<Established>> {
        let inner = self.inner.read();
        match (&inner.established, inner.state) {
            (Some(established), ChannelState::Initialized) => Ok(established.clone()),
            (_, state) => Err(ChannelError::NotInitialized(state)),
        }
    }

    /// Encrypt a payload, returning base64 ciphertext
    pub fn encrypt(&self, payload: impl Into<Payload>) -> ChannelResult<String> {
        let established = self.established()?;
        seal_payload(&established.cipher, payload)
    }

    /// Serialize any value to JSON and encrypt it
    pub fn encrypt_json<T: Serialize + ?Sized>(&self, value: &T) -> ChannelResult<String> {
        let established = self.established()?;
        let value = serde_json::to_value(value)?;
        seal_payload(&established.cipher, value)
    }

    /// Decrypt base64 ciphertext produced under this session's key
    pub fn decrypt(&self, cipher_text: &str) -> ChannelResult<Decrypted> {
        let established = self.established()?;
        open_payload(&established.cipher, cipher_text)
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionKeyMaterial;
    use rand::RngCore;
    use serde_json::json;

    fn initialized_channel(iv_mode: IvMode) -> SecureChannel {
        let channel = SecureChannel::new();
        channel.adopt(
            SessionCipher::new(SessionKeyMaterial::generate(), iv_mode),
            SessionId::new("sess-test").unwrap(),
        );
        channel
    }

    #[test]
    fn test_round_trip_structured_values() {
        let channel = initialized_channel(IvMode::SessionFixed);

        for value in [
            json!({}),
            json!({ "case": { "parties": ["a", "b"], "year": 2024, "open": true } }),
            json!("plain string"),
        ] {
            let encrypted = channel.encrypt(value.clone()).unwrap();
            assert_eq!(
                channel.decrypt(&encrypted).unwrap(),
                Decrypted::Structured(value)
            );
        }
    }

    #[test]
    fn test_plain_text_comes_back_as_text() {
        let channel = initialized_channel(IvMode::SessionFixed);
        let encrypted = channel.encrypt("not json at all").unwrap();
        assert_eq!(
            channel.decrypt(&encrypted).unwrap(),
            Decrypted::Text("not json at all".to_string())
        );
    }

    #[test]
    fn test_non_utf8_bytes_come_back_as_bytes() {
        let channel = initialized_channel(IvMode::PerMessage);
        let raw = vec![0xffu8, 0xfe, 0x00, 0x80];
        let encrypted = channel.encrypt(raw.clone()).unwrap();
        assert_eq!(channel.decrypt(&encrypted).unwrap(), Decrypted::Bytes(raw));
    }

    #[test]
    fn test_encrypt_json_matches_value() {
        #[derive(Serialize)]
        struct Request<'a> {
            legal_case: &'a str,
        }

        let channel = initialized_channel(IvMode::SessionFixed);
        let encrypted = channel
            .encrypt_json(&Request {
                legal_case: "X davası",
            })
            .unwrap();
        assert_eq!(
            channel.decrypt(&encrypted).unwrap(),
            Decrypted::Structured(json!({ "legal_case": "X davası" }))
        );
    }

    #[test]
    fn test_uninitialized_channel_refuses() {
        let channel = SecureChannel::new();
        assert!(matches!(
            channel.encrypt("x"),
            Err(ChannelError::NotInitialized(ChannelState::Uninitialized))
        ));
        assert!(matches!(
            channel.decrypt("AAAA"),
            Err(ChannelError::NotInitialized(ChannelState::Uninitialized))
        ));
        assert!(channel.session_id().is_none());
    }

    #[test]
    fn test_failed_channel_refuses() {
        let channel = initialized_channel(IvMode::SessionFixed);
        channel.mark_failed();
        assert!(matches!(
            channel.encrypt(json!({})),
            Err(ChannelError::NotInitialized(ChannelState::Failed))
        ));
    }

    #[test]
    fn test_foreign_ciphertext_fails_without_deinitializing() {
        let channel = initialized_channel(IvMode::SessionFixed);

        let mut random = vec![0u8; 48];
        rand::thread_rng().fill_bytes(&mut random);
        let foreign = bytes_to_text(&random);

        // Random blocks can unpad by chance; only a clean failure or a
        // non-matching value is acceptable, never a panic.
        match channel.decrypt(&foreign) {
            Err(ChannelError::DecryptFailed) => {}
            Ok(value) => assert_ne!(value, Decrypted::Structured(json!({}))),
            Err(other) => panic!("unexpected error: {other}"),
        }

        let other = initialized_channel(IvMode::SessionFixed);
        let encrypted = other.encrypt(json!({ "a": 1 })).unwrap();
        assert!(!matches!(
            channel.decrypt(&encrypted),
            Ok(Decrypted::Structured(ref v)) if *v == json!({ "a": 1 })
        ));

        assert!(channel.is_initialized());
    }

    #[test]
    fn test_unaligned_ciphertext_is_decrypt_failure() {
        let channel = initialized_channel(IvMode::SessionFixed);
        let truncated = bytes_to_text(&[1u8; 20]);
        assert!(matches!(
            channel.decrypt(&truncated),
            Err(ChannelError::DecryptFailed)
        ));
    }

    #[test]
    fn test_malformed_base64_is_decode_error() {
        let channel = initialized_channel(IvMode::SessionFixed);
        assert!(matches!(
            channel.decrypt("not*base64"),
            Err(ChannelError::Decode(_))
        ));
        assert!(channel.is_initialized());
    }

    #[test]
    fn test_reset_drops_material() {
        let channel = initialized_channel(IvMode::SessionFixed);
        channel.reset();
        assert_eq!(channel.state(), ChannelState::Uninitialized);
        assert!(channel.iv_mode().is_none());
    }

    #[test]
    fn test_concurrent_encrypt_decrypt() {
        let channel = Arc::new(initialized_channel(IvMode::PerMessage));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let channel = channel.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        let value = json!({ "worker": i, "message": j });
                        let encrypted = channel.encrypt(value.clone()).unwrap();
                        assert_eq!(
                            channel.decrypt(&encrypted).unwrap(),
                            Decrypted::Structured(value)
                        );
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
