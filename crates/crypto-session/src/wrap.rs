//! RSA-OAEP wrapping of session key material
//!
//! The padding/hash pair is fixed: OAEP with SHA-256 for both the label hash
//! and MGF1, empty label. Nothing about it is negotiated.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use shared_protocol::{IvMode, WrappedKeyPayload};
use zeroize::Zeroizing;

use crate::encoding::{armored_key_to_raw_bytes, bytes_to_text, text_to_bytes};
use crate::{CryptoError, CryptoResult, SessionKeyMaterial};

/// Key size the key server generates by default
pub const DEFAULT_RSA_BITS: usize = 2048;

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Import an armored SubjectPublicKeyInfo block for encryption
pub fn import_public_key(pem: &str) -> CryptoResult<RsaPublicKey> {
    let der = armored_key_to_raw_bytes(pem)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// Armor a public key the way the key server publishes it
pub fn export_public_key(key: &RsaPublicKey) -> CryptoResult<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyFormat(e.to_string()))
}

/// Generate an RSA key pair for the server side of the exchange
pub fn generate_private_key(bits: usize) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| CryptoError::KeyGeneration(e.to_string()))
}

/// Encrypt `{key, iv[, iv_mode]}` under the server public key.
///
/// Returns the base64 text submitted as `encrypted_key`.
pub fn wrap_session_key(
    public_key: &RsaPublicKey,
    material: &SessionKeyMaterial,
    iv_mode: IvMode,
) -> CryptoResult<String> {
    let message = Zeroizing::new(material.to_payload(iv_mode).to_json()?);

    let wrapped = public_key
        .encrypt(&mut OsRng, oaep(), &message)
        .map_err(|e| CryptoError::KeyWrap(e.to_string()))?;

    Ok(bytes_to_text(&wrapped))
}

/// Reverse of [`wrap_session_key`], run by the key server
pub fn unwrap_session_key(
    private_key: &RsaPrivateKey,
    encrypted_key: &str,
) -> CryptoResult<(SessionKeyMaterial, IvMode)> {
    let wrapped = text_to_bytes(encrypted_key)?;

    let message = Zeroizing::new(
        private_key
            .decrypt(oaep(), &wrapped)
            .map_err(|e| CryptoError::KeyUnwrap(e.to_string()))?,
    );

    let payload = WrappedKeyPayload::from_json(&message)?;
    let material = SessionKeyMaterial::from_payload(&payload)?;
    Ok((material, payload.iv_mode))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::LazyLock;

    use super::*;

    /// One 2048-bit key per test binary; generation dominates test time
    pub(crate) static TEST_KEY: LazyLock<RsaPrivateKey> =
        LazyLock::new(|| generate_private_key(DEFAULT_RSA_BITS).unwrap());

    pub(crate) fn test_public_pem() -> String {
        export_public_key(&TEST_KEY.to_public_key()).unwrap()
    }

    #[test]
    fn test_wrap_unwrap() {
        let public = import_public_key(&test_public_pem()).unwrap();
        let material = SessionKeyMaterial::generate();

        let wrapped = wrap_session_key(&public, &material, IvMode::PerMessage).unwrap();
        let (restored, mode) = unwrap_session_key(&TEST_KEY, &wrapped).unwrap();

        assert_eq!(restored.key(), material.key());
        assert_eq!(restored.iv(), material.iv());
        assert_eq!(mode, IvMode::PerMessage);
    }

    #[test]
    fn test_wrapping_is_randomized() {
        let public = import_public_key(&test_public_pem()).unwrap();
        let material = SessionKeyMaterial::generate();

        let first = wrap_session_key(&public, &material, IvMode::SessionFixed).unwrap();
        let second = wrap_session_key(&public, &material, IvMode::SessionFixed).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_import_tolerates_crlf() {
        let crlf = test_public_pem().replace('\n', "\r\n");
        assert_eq!(
            import_public_key(&crlf).unwrap(),
            TEST_KEY.to_public_key()
        );
    }

    #[test]
    fn test_import_rejects_non_key_content() {
        let bogus = "-----BEGIN PUBLIC KEY-----\nAAECAwQF\n-----END PUBLIC KEY-----\n";
        assert!(matches!(
            import_public_key(bogus),
            Err(CryptoError::KeyFormat(_))
        ));
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let other = generate_private_key(1024).unwrap();
        let public = import_public_key(&test_public_pem()).unwrap();
        let wrapped =
            wrap_session_key(&public, &SessionKeyMaterial::generate(), IvMode::SessionFixed)
                .unwrap();

        assert!(matches!(
            unwrap_session_key(&other, &wrapped),
            Err(CryptoError::KeyUnwrap(_))
        ));
    }
}
