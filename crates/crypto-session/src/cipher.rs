//! AES-256-CBC codec bound to one session's key material

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;
use rand::rngs::OsRng;
use shared_protocol::{IV_SIZE, IvMode};

use crate::{CryptoError, CryptoResult, SessionKeyMaterial};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Symmetric cipher for an established session.
///
/// In [`IvMode::SessionFixed`] every message uses the handshake IV, which
/// leaks equality of plaintext prefixes. In [`IvMode::PerMessage`] each
/// ciphertext is `iv || cbc(plaintext)` with a fresh IV.
pub struct SessionCipher {
    material: SessionKeyMaterial,
    iv_mode: IvMode,
}

impl SessionCipher {
    pub fn new(material: SessionKeyMaterial, iv_mode: IvMode) -> Self {
        Self { material, iv_mode }
    }

    pub fn iv_mode(&self) -> IvMode {
        self.iv_mode
    }

    pub fn material(&self) -> &SessionKeyMaterial {
        &self.material
    }

    /// Encrypt with PKCS#7 padding
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.iv_mode {
            IvMode::SessionFixed => self.encrypt_with_iv(self.material.iv(), plaintext),
            IvMode::PerMessage => {
                let mut iv = [0u8; IV_SIZE];
                OsRng.fill_bytes(&mut iv);
                let body = self.encrypt_with_iv(&iv, plaintext)?;

                let mut out = Vec::with_capacity(IV_SIZE + body.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&body);
                Ok(out)
            }
        }
    }

    /// Decrypt and strip padding; any malformed input is `DecryptionFailed`
    pub fn decrypt(&self, ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        match self.iv_mode {
            IvMode::SessionFixed => self.decrypt_with_iv(self.material.iv(), ciphertext),
            IvMode::PerMessage => {
                if ciphertext.len() < IV_SIZE {
                    return Err(CryptoError::DecryptionFailed);
                }
                let (iv, body) = ciphertext.split_at(IV_SIZE);
                self.decrypt_with_iv(iv, body)
            }
        }
    }

    fn encrypt_with_iv(&self, iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Aes256CbcEnc::new_from_slices(self.material.key(), iv)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
    }

    fn decrypt_with_iv(&self, iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::DecryptionFailed);
        }

        let cipher = Aes256CbcDec::new_from_slices(self.material.key(), iv)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}
