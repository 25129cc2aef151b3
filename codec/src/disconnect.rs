// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet,
    PacketType, Properties, ReasonCode,
};

/// Reason codes a DISCONNECT may carry.
pub const DISCONNECT_REASONS: &[ReasonCode] = &[
    ReasonCode::Success,
    ReasonCode::DisconnectWithWillMessage,
    ReasonCode::UnspecifiedError,
    ReasonCode::MalformedPacket,
    ReasonCode::ProtocolError,
    ReasonCode::ImplementationSpecificError,
    ReasonCode::NotAuthorized,
    ReasonCode::ServerBusy,
    ReasonCode::ServerShuttingDown,
    ReasonCode::KeepAliveTimeout,
    ReasonCode::SessionTakenOver,
    ReasonCode::TopicFilterInvalid,
    ReasonCode::ReceiveMaximumExceeded,
    ReasonCode::TopicAliasInvalid,
    ReasonCode::PacketTooLarge,
    ReasonCode::MessageRateTooHigh,
    ReasonCode::QuotaExceeded,
    ReasonCode::AdministrativeAction,
    ReasonCode::PayloadFormatInvalid,
];

/// DISCONNECT is the final packet on a connection.
///
/// An empty body means a normal disconnection (reason 0x00); otherwise the
/// body is a reason code optionally followed by properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisconnectPacket {
    reason_code: ReasonCode,
    properties: Properties,
}

impl DisconnectPacket {
    #[must_use]
    pub fn new(reason_code: ReasonCode) -> Self {
        Self {
            reason_code,
            properties: Properties::new(),
        }
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

impl DecodePacket for DisconnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Disconnect {
            return Err(DecodeError::InvalidPacketType);
        }

        // Remaining length 0 stands for a normal disconnection.
        if fixed_header.remaining_length() == 0 {
            return Ok(Self::default());
        }

        let reason_code = ReasonCode::try_from(ba.read_byte()?)?;
        if !DISCONNECT_REASONS.contains(&reason_code) {
            return Err(DecodeError::InvalidReasonCode);
        }

        let properties = Properties::decode_for(ba, PacketType::Disconnect)?;

        if ba.offset() != fixed_header.bytes() + fixed_header.remaining_length() {
            return Err(DecodeError::InvalidRemainingLength);
        }

        Ok(Self {
            reason_code,
            properties,
        })
    }
}

impl EncodePacket for DisconnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let remaining_length = ReasonCode::bytes() + self.properties.bytes();
        let fixed_header = FixedHeader::new(PacketType::Disconnect, remaining_length)?;
        fixed_header.encode(buf)?;
        self.reason_code.encode(buf)?;
        self.properties.encode(buf)?;

        Ok(buf.len() - old_len)
    }
}

impl Packet for DisconnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Disconnect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_body() {
        let buf = [0xe0, 0x00];
        let mut ba = ByteArray::new(&buf);
        let packet = DisconnectPacket::decode(&mut ba).unwrap();
        assert_eq!(packet.reason_code(), ReasonCode::Success);
    }

    #[test]
    fn test_decode_reason_only() {
        let buf = [0xe0, 0x01, 0x04];
        let mut ba = ByteArray::new(&buf);
        let packet = DisconnectPacket::decode(&mut ba).unwrap();
        assert_eq!(
            packet.reason_code(),
            ReasonCode::DisconnectWithWillMessage
        );
        assert!(packet.properties().is_empty());
    }

    #[test]
    fn test_decode_rejects_foreign_reason() {
        // 0x84 belongs to CONNACK.
        let buf = [0xe0, 0x01, 0x84];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            DisconnectPacket::decode(&mut ba),
            Err(DecodeError::InvalidReasonCode)
        );
    }

    #[test]
    fn test_decode_rejects_bad_flags() {
        let buf = [0xe1, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            DisconnectPacket::decode(&mut ba),
            Err(DecodeError::InvalidPacketFlags)
        );
    }

    #[test]
    fn test_roundtrip() {
        let packet = DisconnectPacket::new(ReasonCode::KeepAliveTimeout);
        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();

        let mut ba = ByteArray::new(&buf);
        let decoded = DisconnectPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }
}
