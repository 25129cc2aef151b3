// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet,
    PacketType, Properties, ReasonCode,
};

/// Reason codes a CONNACK may carry.
pub const CONNECT_ACK_REASONS: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::UnspecifiedError,
    ReasonCode::MalformedPacket,
    ReasonCode::ProtocolError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::UnsupportedProtocolVersion,
    ReasonCode::ClientIdentifierNotValid,
    ReasonCode::BadUserNameOrPassword,
    ReasonCode::NotAuthorized,
    ReasonCode::ServerUnavailable,
    ReasonCode::ServerBusy,
    ReasonCode::Banned,
    ReasonCode::BadAuthenticationMethod,
    ReasonCode::PacketTooLarge,
    ReasonCode::QuotaExceeded,
    ReasonCode::PayloadFormatInvalid,
    ReasonCode::RetainNotSupported,
    ReasonCode::QoSNotSupported,
    ReasonCode::UseAnotherServer,
    ReasonCode::ServerMoved,
    ReasonCode::ConnectionRateExceeded,
];

/// CONNACK is the server's reply to a CONNECT packet and must be the first
/// packet it sends. There is no payload.
///
/// ```txt
///  7                       0
/// +-------------------------+
/// | Fixed header            |
/// +-------------------------+
/// | Ack flags               |
/// +-------------------------+
/// | Reason code             |
/// +-------------------------+
/// | Properties              |
/// +-------------------------+
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectAckPacket {
    /// Bit 0 of the ack-flags byte. Set when the server resumes stored
    /// session state; always clear when the reason code is an error.
    session_present: bool,

    reason_code: ReasonCode,

    properties: Properties,
}

impl ConnectAckPacket {
    #[must_use]
    pub fn new(session_present: bool, reason_code: ReasonCode) -> Self {
        Self {
            // An error CONNACK must not claim a present session.
            session_present: session_present && !reason_code.is_error(),
            reason_code,
            properties: Properties::new(),
        }
    }

    /// The four-byte error form: fixed header, clear ack flags and the
    /// reason, with an empty property list elided.
    ///
    /// Used when session configuration failed before a full CONNACK could
    /// be assembled.
    #[must_use]
    pub const fn short_error(reason_code: ReasonCode) -> [u8; 4] {
        [0x20, 0x02, 0x00, reason_code as u8]
    }

    #[must_use]
    pub const fn session_present(&self) -> bool {
        self.session_present
    }

    #[must_use]
    pub const fn reason_code(&self) -> ReasonCode {
        self.reason_code
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

impl DecodePacket for ConnectAckPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::ConnectAck {
            return Err(DecodeError::InvalidPacketType);
        }

        let ack_flags = ba.read_byte()?;
        let session_present = ack_flags & 0b0000_0001 != 0;
        let reason_code = ReasonCode::try_from(ba.read_byte()?)?;
        if !CONNECT_ACK_REASONS.contains(&reason_code) {
            return Err(DecodeError::InvalidReasonCode);
        }

        // The short error form carries no property list at all.
        let properties = if fixed_header.remaining_length() > 2 {
            Properties::decode_for(ba, PacketType::ConnectAck)?
        } else {
            Properties::new()
        };

        Ok(Self {
            session_present,
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for ConnectAckPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        // Phase one: the exact body size.
        let remaining_length = 1 + ReasonCode::bytes() + self.properties.bytes();
        let fixed_header = FixedHeader::new(PacketType::ConnectAck, remaining_length)?;

        // Phase two: write it out.
        fixed_header.encode(buf)?;
        buf.push(u8::from(self.session_present));
        self.reason_code.encode(buf)?;
        self.properties.encode(buf)?;

        // The two phases disagreeing is a bug in the size computation, not
        // a peer problem.
        let written = buf.len() - old_len;
        let expected = fixed_header.bytes() + remaining_length;
        debug_assert_eq!(written, expected);
        if written != expected {
            return Err(EncodeError::LengthMismatch);
        }
        Ok(written)
    }
}

impl Packet for ConnectAckPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::ConnectAck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Property, StringData, U16Data, U32Data};

    #[test]
    fn test_encode_minimal() {
        let packet = ConnectAckPacket::new(false, ReasonCode::Success);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(&buf, &[0x20, 0x03, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_short_error_form() {
        assert_eq!(
            ConnectAckPacket::short_error(ReasonCode::UnsupportedProtocolVersion),
            [0x20, 0x02, 0x00, 0x84]
        );
        assert_eq!(
            ConnectAckPacket::short_error(ReasonCode::ServerBusy),
            [0x20, 0x02, 0x00, 0x89]
        );
    }

    #[test]
    fn test_short_error_form_decodes() {
        let buf = ConnectAckPacket::short_error(ReasonCode::ServerBusy);
        let mut ba = ByteArray::new(&buf);
        let packet = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(packet.reason_code(), ReasonCode::ServerBusy);
        assert!(!packet.session_present());
    }

    #[test]
    fn test_error_ack_clears_session_present() {
        let packet = ConnectAckPacket::new(true, ReasonCode::ServerBusy);
        assert!(!packet.session_present());
    }

    #[test]
    fn test_roundtrip_with_properties() {
        let mut packet = ConnectAckPacket::new(true, ReasonCode::Success);
        packet
            .properties_mut()
            .push(Property::SessionExpiryInterval(U32Data::new(120)))
            .unwrap();
        packet
            .properties_mut()
            .push(Property::ReceiveMaximum(U16Data::new(64)))
            .unwrap();
        packet
            .properties_mut()
            .push(Property::AssignedClientIdentifier(
                StringData::from("petrel0a1b2c3d4e5f").unwrap(),
            ))
            .unwrap();

        let mut buf = Vec::new();
        let written = packet.encode(&mut buf).unwrap();
        assert_eq!(written, buf.len());

        let mut ba = ByteArray::new(&buf);
        let decoded = ConnectAckPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_decode_rejects_unknown_reason() {
        // 0x8d (keep-alive timeout) is a DISCONNECT reason, not a CONNACK one.
        let buf = [0x20, 0x03, 0x00, 0x8d, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            ConnectAckPacket::decode(&mut ba),
            Err(DecodeError::InvalidReasonCode)
        );
    }
}
