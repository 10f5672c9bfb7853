//! Binary/text encoding helpers shared by the handshake and the channel

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{CryptoError, CryptoResult};

/// Encode bytes as standard, padded base64 without line wrapping
pub fn bytes_to_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64; rejects foreign characters and bad padding
pub fn text_to_bytes(text: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::Decode(e.to_string()))
}

/// Strip the marker lines of an armored key block and decode its body.
///
/// Lines are trimmed individually, so CRLF, LF, indentation and blank lines
/// all yield the same bytes.
pub fn armored_key_to_raw_bytes(pem: &str) -> CryptoResult<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_marker_line(line))
        .collect();

    if body.is_empty() {
        return Err(CryptoError::KeyFormat(
            "armored block has no content".to_string(),
        ));
    }

    text_to_bytes(&body)
}

fn is_marker_line(line: &str) -> bool {
    line.starts_with("-----BEGIN") || line.starts_with("-----END")
}
