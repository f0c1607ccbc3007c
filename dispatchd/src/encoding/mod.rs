//! Base64 and base64url helpers
//!
//! Token segments are emitted as unpadded base64url; decoders accept both
//! padded and unpadded input so externally produced values round-trip.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::EngineError;

/// Standard alphabet, padded on encode, padding-indifferent on decode.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// URL-safe alphabet, unpadded on encode, padding-indifferent on decode.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode with the standard alphabet, padded to a multiple of four.
#[must_use]
pub fn base64_encode(input: impl AsRef<[u8]>) -> String {
    STANDARD_LENIENT.encode(input)
}

/// Decode standard base64, accepting padded and unpadded input.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, EngineError> {
    STANDARD_LENIENT
        .decode(input)
        .map_err(|err| EngineError::Parse(format!("invalid base64: {err}")))
}

/// Encode with the URL-safe alphabet, without padding.
#[must_use]
pub fn base64url_encode(input: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(input)
}

/// Decode URL-safe base64, accepting padded and unpadded input.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, EngineError> {
    URL_SAFE_LENIENT
        .decode(input)
        .map_err(|err| EngineError::Parse(format!("invalid base64url: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_round_trip() {
        let inputs: &[&[u8]] = &[b"", b"f", b"fo", b"foo", b"foob", b"fooba", b"foobar"];
        for input in inputs {
            let encoded = base64_encode(input);
            assert_eq!(base64_decode(&encoded).unwrap(), *input);
        }
    }

    #[test]
    fn test_base64_known_vectors() {
        assert_eq!(base64_encode(b"hello world"), "aGVsbG8gd29ybGQ=");
        assert_eq!(base64_decode("aGVsbG8gd29ybGQ=").unwrap(), b"hello world");
    }

    #[test]
    fn test_base64_encoding_preserves_length_class() {
        for len in 0..64_usize {
            let bytes = vec![0xAB_u8; len];
            let encoded = base64_encode(&bytes);
            assert_eq!(encoded.len(), len.div_ceil(3) * 4);
        }
    }

    #[test]
    fn test_base64url_round_trip() {
        let input: Vec<u8> = (0..=u8::MAX).collect();
        let encoded = base64url_encode(&input);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(base64url_decode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_base64url_accepts_padded_and_unpadded() {
        // "any carnal pleasure" is the classic padding-sensitive vector
        let padded = "YW55IGNhcm5hbCBwbGVhc3VyZQ==";
        let unpadded = "YW55IGNhcm5hbCBwbGVhc3VyZQ";
        assert_eq!(
            base64url_decode(padded).unwrap(),
            base64url_decode(unpadded).unwrap()
        );
        assert_eq!(base64url_decode(unpadded).unwrap(), b"any carnal pleasure");
    }

    #[test]
    fn test_base64url_rejects_invalid_characters() {
        assert!(base64url_decode("not*valid").is_err());
    }
}
