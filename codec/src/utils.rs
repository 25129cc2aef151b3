// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! UTF-8 classification and client-id helpers shared by the data carriers.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::{DecodeError, EncodeError};

/// Longest client id the broker stores without rejecting, in bytes.
pub const CLIENT_ID_MAX_BYTES: usize = 23;

/// Outcome of scanning a byte string against the MQTT UTF-8 rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utf8Check {
    WellFormed,

    /// Well-formed but contains control or non-character code points.
    /// Packets carrying these are accepted.
    WellFormedNoCharacter,

    /// Must be treated as a malformed packet: U+0000, overlong encodings,
    /// UTF-16 surrogates, values beyond U+10FFFF or stray continuation bytes.
    IllFormed,
}

/// Classify raw bytes without allocating.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn check_utf8(bytes: &[u8]) -> Utf8Check {
    let mut result = Utf8Check::WellFormed;
    let mut i = 0;

    while i < bytes.len() {
        let byte1 = bytes[i];
        if byte1 < 0x80 {
            // Single byte.
            if byte1 == 0x00 {
                return Utf8Check::IllFormed;
            }
            if byte1 <= 0x1f || byte1 == 0x7f {
                result = Utf8Check::WellFormedNoCharacter;
            }
            i += 1;
        } else if byte1 & 0b1110_0000 == 0b1100_0000 {
            // Two bytes.
            if i + 2 > bytes.len() {
                return Utf8Check::IllFormed;
            }
            let byte2 = bytes[i + 1];
            if byte2 & 0b1100_0000 != 0b1000_0000 {
                return Utf8Check::IllFormed;
            }
            if byte1 & 0b1111_1110 == 0b1100_0000 {
                // Overlong: 0xC0 / 0xC1 leads re-encode 7-bit values.
                return Utf8Check::IllFormed;
            }
            if byte1 == 0xc2 && (0x80..=0x9f).contains(&byte2) {
                // U+0080..U+009F control characters.
                result = Utf8Check::WellFormedNoCharacter;
            }
            i += 2;
        } else if byte1 & 0b1111_0000 == 0b1110_0000 {
            // Three bytes.
            if i + 3 > bytes.len() {
                return Utf8Check::IllFormed;
            }
            let byte2 = bytes[i + 1];
            let byte3 = bytes[i + 2];
            if byte2 & 0b1100_0000 != 0b1000_0000 || byte3 & 0b1100_0000 != 0b1000_0000 {
                return Utf8Check::IllFormed;
            }
            if byte1 == 0xe0 && byte2 < 0xa0 {
                // Overlong.
                return Utf8Check::IllFormed;
            }
            if byte1 == 0xed && byte2 >= 0xa0 {
                // UTF-16 surrogates U+D800..U+DFFF.
                return Utf8Check::IllFormed;
            }
            if byte1 == 0xef && byte2 == 0xbf && byte3 & 0b1111_1110 == 0b1011_1110 {
                // U+FFFE / U+FFFF.
                result = Utf8Check::WellFormedNoCharacter;
            }
            i += 3;
        } else if byte1 & 0b1111_1000 == 0b1111_0000 {
            // Four bytes.
            if i + 4 > bytes.len() {
                return Utf8Check::IllFormed;
            }
            let byte2 = bytes[i + 1];
            let byte3 = bytes[i + 2];
            let byte4 = bytes[i + 3];
            if byte2 & 0b1100_0000 != 0b1000_0000
                || byte3 & 0b1100_0000 != 0b1000_0000
                || byte4 & 0b1100_0000 != 0b1000_0000
            {
                return Utf8Check::IllFormed;
            }
            if byte1 == 0xf0 && byte2 < 0x90 {
                // Overlong.
                return Utf8Check::IllFormed;
            }
            if byte1 > 0xf4 || (byte1 == 0xf4 && byte2 > 0x8f) {
                // Beyond U+10FFFF.
                return Utf8Check::IllFormed;
            }
            if byte2 & 0b0000_1111 == 0b0000_1111
                && byte3 == 0xbf
                && byte4 & 0b1111_1110 == 0b1011_1110
            {
                // Plane non-characters U+nFFFE / U+nFFFF.
                result = Utf8Check::WellFormedNoCharacter;
            }
            i += 4;
        } else {
            // Continuation byte without a lead, or a 5+ byte sequence.
            return Utf8Check::IllFormed;
        }
    }

    result
}

/// Convert raw bytes to an owned string, rejecting ill-formed input.
///
/// # Errors
///
/// Returns error if `bytes` is not well-formed UTF-8.
pub fn to_utf8_string(bytes: &[u8]) -> Result<String, DecodeError> {
    if check_utf8(bytes) == Utf8Check::IllFormed {
        return Err(DecodeError::InvalidString);
    }
    String::from_utf8(bytes.to_vec()).map_err(|_err| DecodeError::InvalidString)
}

/// Validate a string about to be written to the wire.
///
/// # Errors
///
/// Returns error if `s` is longer than a two-byte length prefix allows
/// or is ill-formed.
pub fn validate_utf8_string(s: &str) -> Result<(), EncodeError> {
    if s.len() > 0xffff {
        return Err(EncodeError::TooManyData);
    }
    if check_utf8(s.as_bytes()) == Utf8Check::IllFormed {
        return Err(EncodeError::InvalidData);
    }
    Ok(())
}

/// Validate binary data about to be written behind a two-byte length prefix.
///
/// # Errors
///
/// Returns error if `data` is longer than 64KiB.
pub fn validate_two_bytes_data(data: &[u8]) -> Result<(), EncodeError> {
    if data.len() > 0xffff {
        return Err(EncodeError::TooManyData);
    }
    Ok(())
}

/// Check client-id constraints: at most 23 bytes, alphanumeric only.
///
/// An empty id is accepted here; the broker assigns one.
///
/// # Errors
///
/// Returns error if `id` is too long or contains other characters.
pub fn validate_client_id(id: &str) -> Result<(), DecodeError> {
    if id.len() > CLIENT_ID_MAX_BYTES {
        return Err(DecodeError::InvalidClientId);
    }
    if !id.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
        return Err(DecodeError::InvalidClientId);
    }
    Ok(())
}

/// Generate a server-assigned client id. Always passes `validate_client_id`.
#[must_use]
pub fn random_client_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("petrel{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed() {
        assert_eq!(check_utf8(b"test"), Utf8Check::WellFormed);
        assert_eq!(check_utf8("grüße".as_bytes()), Utf8Check::WellFormed);
        assert_eq!(check_utf8("日本語".as_bytes()), Utf8Check::WellFormed);
        // U+10FFFF is the last valid code point.
        assert_eq!(check_utf8(&[0xf4, 0x8f, 0xbf, 0xbd]), Utf8Check::WellFormed);
        // A byte-order mark is kept, not stripped.
        assert_eq!(check_utf8(&[0xef, 0xbb, 0xbf]), Utf8Check::WellFormed);
    }

    #[test]
    fn test_no_character_code_points() {
        assert_eq!(check_utf8(&[0x01]), Utf8Check::WellFormedNoCharacter);
        assert_eq!(check_utf8(&[0x7f]), Utf8Check::WellFormedNoCharacter);
        // U+009F
        assert_eq!(check_utf8(&[0xc2, 0x9f]), Utf8Check::WellFormedNoCharacter);
        // U+FFFF
        assert_eq!(check_utf8(&[0xef, 0xbf, 0xbf]), Utf8Check::WellFormedNoCharacter);
    }

    #[test]
    fn test_ill_formed() {
        // Null code point.
        assert_eq!(check_utf8(&[0x00]), Utf8Check::IllFormed);
        // Overlong null.
        assert_eq!(check_utf8(&[0xc0, 0x80]), Utf8Check::IllFormed);
        // Overlong three-byte form.
        assert_eq!(check_utf8(&[0xe0, 0x80, 0xaf]), Utf8Check::IllFormed);
        // UTF-16 surrogate U+D800.
        assert_eq!(check_utf8(&[0xed, 0xa0, 0x80]), Utf8Check::IllFormed);
        // Beyond U+10FFFF.
        assert_eq!(check_utf8(&[0xf4, 0x90, 0x80, 0x80]), Utf8Check::IllFormed);
        // Stray continuation byte.
        assert_eq!(check_utf8(&[0x80]), Utf8Check::IllFormed);
        // Truncated sequence.
        assert_eq!(check_utf8(&[0xe2, 0x82]), Utf8Check::IllFormed);
        // Lead byte without continuation.
        assert_eq!(check_utf8(&[0xc3, 0x28]), Utf8Check::IllFormed);
    }

    #[test]
    fn test_client_id() {
        assert!(validate_client_id("test").is_ok());
        assert!(validate_client_id("").is_ok());
        assert!(validate_client_id("a1B2c3").is_ok());
        assert!(validate_client_id("has space").is_err());
        assert!(validate_client_id("twentyfourcharactersxxxx").is_err());
    }

    #[test]
    fn test_random_client_id_is_valid() {
        let id = random_client_id();
        assert!(validate_client_id(&id).is_ok());
        assert!(!id.is_empty());
    }
}
