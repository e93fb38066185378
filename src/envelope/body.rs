//! Body transcoding between raw bytes and envelope text.

use axum::body::Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::envelope::EnvelopeError;

/// Encode a body for an envelope.
///
/// Returns the body text and whether it was base64-encoded. Valid UTF-8 is
/// stored literally; anything else is base64-encoded.
pub fn encode(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_owned(), false),
        Err(_) => (STANDARD.encode(bytes), true),
    }
}

/// Decode an envelope body back into raw bytes.
pub fn decode(body: String, is_base64_encoded: bool) -> Result<Bytes, EnvelopeError> {
    if is_base64_encoded {
        Ok(Bytes::from(STANDARD.decode(body.as_bytes())?))
    } else {
        Ok(Bytes::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_body_is_literal() {
        let (body, is_base64) = encode(r#"{"hello":"world"}"#.as_bytes());
        assert_eq!(body, r#"{"hello":"world"}"#);
        assert!(!is_base64);
    }

    #[test]
    fn test_binary_body_is_base64() {
        let raw = [0xff, 0xfe, 0x00, 0x80, b'a'];
        let (body, is_base64) = encode(&raw);
        assert!(is_base64);
        assert_eq!(decode(body, is_base64).unwrap().as_ref(), &raw);
    }

    #[test]
    fn test_empty_body() {
        let (body, is_base64) = encode(b"");
        assert_eq!(body, "");
        assert!(!is_base64);
        assert!(decode(body, is_base64).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = decode("not base64!!".to_string(), true).unwrap_err();
        assert!(matches!(err, EnvelopeError::Base64(_)));
    }
}
