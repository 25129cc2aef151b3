// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use bytes::Bytes;

use crate::{
    ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket, FixedHeader, Packet, PacketId,
    PacketType, Properties, PubTopic, QoS,
};

/// PUBLISH transports an application message in either direction.
///
/// ```txt
///  7                     0
/// +-----------------------+
/// | Fixed header          |
/// +-----------------------+
/// | Topic name            |
/// +-----------------------+
/// | Packet id (QoS > 0)   |
/// +-----------------------+
/// | Properties            |
/// +-----------------------+
/// | Message payload ...   |
/// +-----------------------+
/// ```
///
/// DUP, QoS and RETAIN ride in the flag nibble of the fixed header. The
/// payload runs to the end of the remaining length; a zero-length payload is
/// valid on the wire (the broker applies its own size policy).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishPacket {
    /// Set on re-delivery. Must be 0 for QoS 0 messages.
    dup: bool,

    qos: QoS,

    /// Ask the server to keep the message for future subscribers.
    retain: bool,

    topic: PubTopic,

    /// Only meaningful when QoS is 1 or 2; never zero there.
    packet_id: PacketId,

    properties: Properties,

    msg: Bytes,
}

impl PublishPacket {
    /// Build a QoS 0 message.
    ///
    /// # Errors
    ///
    /// Returns error if `topic` is invalid.
    pub fn new(topic: &str, msg: &[u8]) -> Result<Self, EncodeError> {
        Ok(Self {
            topic: PubTopic::new(topic)?,
            msg: Bytes::copy_from_slice(msg),
            ..Self::default()
        })
    }

    #[must_use]
    pub const fn dup(&self) -> bool {
        self.dup
    }

    /// Mark the message as a re-delivery.
    ///
    /// # Errors
    ///
    /// Returns error for QoS 0 messages, which must never carry DUP.
    pub fn set_dup(&mut self, dup: bool) -> Result<&mut Self, EncodeError> {
        if dup && self.qos == QoS::AtMostOnce {
            return Err(EncodeError::InvalidData);
        }
        self.dup = dup;
        Ok(self)
    }

    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    pub fn set_qos(&mut self, qos: QoS, packet_id: PacketId) -> &mut Self {
        self.qos = qos;
        self.packet_id = if qos == QoS::AtMostOnce {
            PacketId::new(0)
        } else {
            packet_id
        };
        self
    }

    #[must_use]
    pub const fn retain(&self) -> bool {
        self.retain
    }

    pub fn set_retain(&mut self, retain: bool) -> &mut Self {
        self.retain = retain;
        self
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.as_ref()
    }

    #[must_use]
    pub const fn packet_id(&self) -> PacketId {
        self.packet_id
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// The application message payload.
    #[must_use]
    pub fn message(&self) -> &[u8] {
        &self.msg
    }

    fn remaining_length(&self) -> usize {
        let mut len = self.topic.bytes() + self.properties.bytes() + self.msg.len();
        if self.qos != QoS::AtMostOnce {
            len += PacketId::bytes();
        }
        len
    }
}

impl DecodePacket for PublishPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        let PacketType::Publish { dup, qos, retain } = fixed_header.packet_type() else {
            return Err(DecodeError::InvalidPacketType);
        };

        // DUP must be clear on the first and only transmission a QoS 0
        // message gets.
        if dup && qos == QoS::AtMostOnce {
            return Err(DecodeError::InvalidPacketFlags);
        }

        let topic = PubTopic::decode(ba)?;

        let packet_id = if qos == QoS::AtMostOnce {
            PacketId::new(0)
        } else {
            let packet_id = PacketId::decode(ba)?;
            if packet_id.value() == 0 {
                return Err(DecodeError::InvalidPacketId);
            }
            packet_id
        };

        let properties = Properties::decode_for(ba, fixed_header.packet_type())?;

        // Whatever the remaining length still covers is the message.
        let end = fixed_header.bytes() + fixed_header.remaining_length();
        if end < ba.offset() {
            return Err(DecodeError::InvalidRemainingLength);
        }
        let msg = Bytes::copy_from_slice(ba.read_bytes(end - ba.offset())?);

        Ok(Self {
            dup,
            qos,
            retain,
            topic,
            packet_id,
            properties,
            msg,
        })
    }
}

impl EncodePacket for PublishPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let packet_type = PacketType::Publish {
            dup: self.dup,
            qos: self.qos,
            retain: self.retain,
        };
        let fixed_header = FixedHeader::new(packet_type, self.remaining_length())?;
        fixed_header.encode(buf)?;

        self.topic.encode(buf)?;
        if self.qos != QoS::AtMostOnce {
            self.packet_id.encode(buf)?;
        }
        self.properties.encode(buf)?;
        buf.extend_from_slice(&self.msg);

        Ok(buf.len() - old_len)
    }
}

impl Packet for PublishPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Publish {
            dup: self.dup,
            qos: self.qos,
            retain: self.retain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_qos0() {
        // topic "a/b", payload "hi".
        let buf = [
            0x30, 0x08, 0x00, 0x03, b'a', b'/', b'b', 0x00, b'h', b'i',
        ];
        let mut ba = ByteArray::new(&buf);
        let packet = PublishPacket::decode(&mut ba).unwrap();
        assert_eq!(packet.topic(), "a/b");
        assert_eq!(packet.qos(), QoS::AtMostOnce);
        assert_eq!(packet.message(), b"hi");
    }

    #[test]
    fn test_decode_qos1_packet_id() {
        let buf = [
            0x32, 0x0a, 0x00, 0x03, b'a', b'/', b'b', 0x12, 0x34, 0x00, b'h', b'i',
        ];
        let mut ba = ByteArray::new(&buf);
        let packet = PublishPacket::decode(&mut ba).unwrap();
        assert_eq!(packet.qos(), QoS::AtLeastOnce);
        assert_eq!(packet.packet_id().value(), 0x1234);
        assert_eq!(packet.message(), b"hi");
    }

    #[test]
    fn test_decode_rejects_zero_packet_id() {
        let buf = [
            0x32, 0x0a, 0x00, 0x03, b'a', b'/', b'b', 0x00, 0x00, 0x00, b'h', b'i',
        ];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            PublishPacket::decode(&mut ba),
            Err(DecodeError::InvalidPacketId)
        );
    }

    #[test]
    fn test_decode_rejects_wildcard_topic() {
        let buf = [
            0x30, 0x08, 0x00, 0x03, b'a', b'/', b'#', 0x00, b'h', b'i',
        ];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            PublishPacket::decode(&mut ba),
            Err(DecodeError::InvalidTopic)
        );
    }

    #[test]
    fn test_decode_rejects_dup_on_qos0() {
        let buf = [
            0x38, 0x08, 0x00, 0x03, b'a', b'/', b'b', 0x00, b'h', b'i',
        ];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            PublishPacket::decode(&mut ba),
            Err(DecodeError::InvalidPacketFlags)
        );
    }

    #[test]
    fn test_roundtrip() {
        let mut packet = PublishPacket::new("metrics/load", b"0.92").unwrap();
        packet.set_qos(QoS::AtLeastOnce, PacketId::new(7));
        packet.set_retain(true);

        let mut buf = Vec::new();
        packet.encode(&mut buf).unwrap();
        assert_eq!(buf[0], 0x33);

        let mut ba = ByteArray::new(&buf);
        let decoded = PublishPacket::decode(&mut ba).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_empty_payload_is_wire_valid() {
        let buf = [0x30, 0x06, 0x00, 0x03, b'a', b'/', b'b', 0x00];
        let mut ba = ByteArray::new(&buf);
        let packet = PublishPacket::decode(&mut ba).unwrap();
        assert!(packet.message().is_empty());
    }
}
