//! base64 encode/decode glue over the standard alphabet.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as standard base64 with padding.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64. Returns `None` when the input is not valid
/// base64, so callers can tell a bad payload apart from an empty one.
pub fn base64_decode(data: &str) -> Option<Vec<u8>> {
    STANDARD.decode(data).ok()
}
