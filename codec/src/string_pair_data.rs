// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::fmt;

use crate::{ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, StringData};

/// Two consecutive UTF-8 encoded strings forming a name-value pair.
///
/// Both halves follow the same well-formedness rules as [`StringData`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringPairData(StringData, StringData);

impl StringPairData {
    /// Build a pair from two string slices.
    ///
    /// # Errors
    ///
    /// Returns error if either half is too long or ill-formed.
    pub fn new(key: &str, value: &str) -> Result<Self, EncodeError> {
        Ok(Self(StringData::from(key)?, StringData::from(value)?))
    }

    #[must_use]
    pub const fn key(&self) -> &StringData {
        &self.0
    }

    #[must_use]
    pub const fn value(&self) -> &StringData {
        &self.1
    }

    /// Byte length in packet.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.0.bytes() + self.1.bytes()
    }
}

impl fmt::Display for StringPairData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

impl DecodePacket for StringPairData {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let key = StringData::decode(ba)?;
        let value = StringData::decode(ba)?;
        Ok(Self(key, value))
    }
}

impl EncodePacket for StringPairData {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let key_len = self.0.encode(buf)?;
        let value_len = self.1.encode(buf)?;
        Ok(key_len + value_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let pair = StringPairData::new("region", "eu-1").unwrap();
        let mut buf = Vec::new();
        let written = pair.encode(&mut buf).unwrap();
        assert_eq!(written, pair.bytes());

        let mut ba = ByteArray::new(&buf);
        let decoded = StringPairData::decode(&mut ba).unwrap();
        assert_eq!(decoded.key().as_ref(), "region");
        assert_eq!(decoded.value().as_ref(), "eu-1");
    }

    #[test]
    fn test_decode_truncated_value() {
        // Key is complete, value length runs past the buffer.
        let buf = [0x00, 0x01, b'k', 0x00, 0x05, b'v'];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            StringPairData::decode(&mut ba),
            Err(DecodeError::OutOfRange)
        );
    }
}
