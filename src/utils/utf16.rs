use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding::all::UTF_16LE;
use encoding::{DecoderTrap, Encoding};

/// Decode a UTF-16LE byte slice, replacing malformed sequences with U+FFFD.
///
/// A trailing odd byte is dropped.
pub fn decode_utf16le_lossy(bytes: &[u8]) -> String {
    let even = &bytes[..bytes.len() & !1];
    UTF_16LE
        .decode(even, DecoderTrap::Replace)
        .unwrap_or_default()
}

/// `StringHttpBody` payloads are base64 of the UTF-16LE request body.
pub fn decode_string_body(encoded: &str) -> Result<String, base64::DecodeError> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(compact.as_bytes())?;

    Ok(decode_utf16le_lossy(&bytes))
}
