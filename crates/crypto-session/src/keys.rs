//! Session key material generated by the client

use rand::RngCore;
use rand::rngs::OsRng;
use shared_protocol::{IV_SIZE, IvMode, SESSION_KEY_SIZE, WrappedKeyPayload};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::{bytes_to_text, text_to_bytes};
use crate::{CryptoError, CryptoResult};

/// A 256-bit AES key and its 128-bit IV, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeyMaterial {
    key: [u8; SESSION_KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl SessionKeyMaterial {
    /// Draw a fresh key and IV from the operating system CSPRNG
    pub fn generate() -> Self {
        let mut key = [0u8; SESSION_KEY_SIZE];
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    pub fn from_parts(key: &[u8], iv: &[u8]) -> CryptoResult<Self> {
        let key: [u8; SESSION_KEY_SIZE] =
            key.try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: SESSION_KEY_SIZE,
                    actual: key.len(),
                })?;
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| CryptoError::InvalidIvLength {
            expected: IV_SIZE,
            actual: iv.len(),
        })?;
        Ok(Self { key, iv })
    }

    pub fn key(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }

    /// Base64 form of the key, as carried in the wrapped payload
    pub fn key_text(&self) -> String {
        bytes_to_text(&self.key)
    }

    /// Base64 form of the IV
    pub fn iv_text(&self) -> String {
        bytes_to_text(&self.iv)
    }

    pub fn to_payload(&self, iv_mode: IvMode) -> WrappedKeyPayload {
        WrappedKeyPayload {
            key: self.key_text(),
            iv: self.iv_text(),
            iv_mode,
        }
    }

    pub fn from_payload(payload: &WrappedKeyPayload) -> CryptoResult<Self> {
        let mut key = text_to_bytes(&payload.key)?;
        let mut iv = text_to_bytes(&payload.iv)?;
        let material = Self::from_parts(&key, &iv);
        key.zeroize();
        iv.zeroize();
        material
    }
}

impl std::fmt::Debug for SessionKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeyMaterial")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}
