// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::convert::TryFrom;

use crate::{
    BinaryData, BoolData, ByteArray, DecodeError, DecodePacket, EncodeError, EncodePacket,
    PacketType, PubTopic, QoS, StringData, StringPairData, U16Data, U32Data, VarInt,
};

/// Wire representation of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Byte,
    TwoByteInt,
    FourByteInt,
    VarByteInt,
    Utf8String,
    Utf8StringPair,
    BinaryData,
}

impl DataType {
    /// Wire size of the value for compile-time-sized carriers, `None` for
    /// length-prefixed and variable ones.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Byte => Some(1),
            Self::TwoByteInt => Some(2),
            Self::FourByteInt => Some(4),
            Self::VarByteInt | Self::Utf8String | Self::Utf8StringPair | Self::BinaryData => None,
        }
    }
}

/// Property identifier as assigned by MQTT v5.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0b,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1a,
    ServerReference = 0x1c,
    ReasonString = 0x1f,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQoS = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2a,
}

impl PropertyType {
    /// Byte length of the identifier itself.
    #[must_use]
    pub const fn bytes() -> usize {
        1
    }

    /// Wire type of the value that follows the identifier.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::PayloadFormatIndicator
            | Self::RequestProblemInformation
            | Self::RequestResponseInformation
            | Self::MaximumQoS
            | Self::RetainAvailable
            | Self::WildcardSubscriptionAvailable
            | Self::SubscriptionIdentifierAvailable
            | Self::SharedSubscriptionAvailable => DataType::Byte,
            Self::ServerKeepAlive
            | Self::ReceiveMaximum
            | Self::TopicAliasMaximum
            | Self::TopicAlias => DataType::TwoByteInt,
            Self::MessageExpiryInterval
            | Self::SessionExpiryInterval
            | Self::WillDelayInterval
            | Self::MaximumPacketSize => DataType::FourByteInt,
            Self::SubscriptionIdentifier => DataType::VarByteInt,
            Self::ContentType
            | Self::ResponseTopic
            | Self::AssignedClientIdentifier
            | Self::AuthenticationMethod
            | Self::ResponseInformation
            | Self::ServerReference
            | Self::ReasonString => DataType::Utf8String,
            Self::UserProperty => DataType::Utf8StringPair,
            Self::CorrelationData | Self::AuthenticationData => DataType::BinaryData,
        }
    }

    /// Whether a second occurrence within one property list is a protocol
    /// error.
    #[must_use]
    pub const fn is_unique(self) -> bool {
        !matches!(self, Self::UserProperty | Self::SubscriptionIdentifier)
    }

    /// Whether this property may appear in the property list of `packet`.
    #[must_use]
    pub const fn allowed_in(self, packet: &PacketType) -> bool {
        match self {
            Self::PayloadFormatIndicator
            | Self::MessageExpiryInterval
            | Self::ContentType
            | Self::ResponseTopic
            | Self::CorrelationData
            | Self::TopicAlias => matches!(packet, PacketType::Publish { .. }),
            Self::SubscriptionIdentifier => {
                matches!(packet, PacketType::Publish { .. } | PacketType::Subscribe)
            }
            Self::SessionExpiryInterval => matches!(
                packet,
                PacketType::Connect | PacketType::ConnectAck | PacketType::Disconnect
            ),
            Self::AssignedClientIdentifier
            | Self::ServerKeepAlive
            | Self::ResponseInformation
            | Self::MaximumQoS
            | Self::RetainAvailable
            | Self::WildcardSubscriptionAvailable
            | Self::SubscriptionIdentifierAvailable
            | Self::SharedSubscriptionAvailable => matches!(packet, PacketType::ConnectAck),
            Self::AuthenticationMethod | Self::AuthenticationData => matches!(
                packet,
                PacketType::Connect | PacketType::ConnectAck | PacketType::Auth
            ),
            Self::RequestProblemInformation | Self::RequestResponseInformation => {
                matches!(packet, PacketType::Connect)
            }
            Self::WillDelayInterval => false,
            Self::ServerReference => {
                matches!(packet, PacketType::ConnectAck | PacketType::Disconnect)
            }
            Self::ReasonString => matches!(
                packet,
                PacketType::ConnectAck
                    | PacketType::PublishAck
                    | PacketType::PublishReceived
                    | PacketType::PublishRelease
                    | PacketType::PublishComplete
                    | PacketType::SubscribeAck
                    | PacketType::UnsubscribeAck
                    | PacketType::Disconnect
                    | PacketType::Auth
            ),
            Self::ReceiveMaximum | Self::TopicAliasMaximum | Self::MaximumPacketSize => {
                matches!(packet, PacketType::Connect | PacketType::ConnectAck)
            }
            Self::UserProperty => !matches!(
                packet,
                PacketType::PingRequest | PacketType::PingResponse
            ),
        }
    }

    /// Whether this property may appear in the will property list of a
    /// CONNECT packet.
    #[must_use]
    pub const fn allowed_in_will(self) -> bool {
        matches!(
            self,
            Self::WillDelayInterval
                | Self::PayloadFormatIndicator
                | Self::MessageExpiryInterval
                | Self::ContentType
                | Self::ResponseTopic
                | Self::CorrelationData
                | Self::UserProperty
        )
    }
}

impl TryFrom<u8> for PropertyType {
    type Error = DecodeError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0x01 => Ok(Self::PayloadFormatIndicator),
            0x02 => Ok(Self::MessageExpiryInterval),
            0x03 => Ok(Self::ContentType),
            0x08 => Ok(Self::ResponseTopic),
            0x09 => Ok(Self::CorrelationData),
            0x0b => Ok(Self::SubscriptionIdentifier),
            0x11 => Ok(Self::SessionExpiryInterval),
            0x12 => Ok(Self::AssignedClientIdentifier),
            0x13 => Ok(Self::ServerKeepAlive),
            0x15 => Ok(Self::AuthenticationMethod),
            0x16 => Ok(Self::AuthenticationData),
            0x17 => Ok(Self::RequestProblemInformation),
            0x18 => Ok(Self::WillDelayInterval),
            0x19 => Ok(Self::RequestResponseInformation),
            0x1a => Ok(Self::ResponseInformation),
            0x1c => Ok(Self::ServerReference),
            0x1f => Ok(Self::ReasonString),
            0x21 => Ok(Self::ReceiveMaximum),
            0x22 => Ok(Self::TopicAliasMaximum),
            0x23 => Ok(Self::TopicAlias),
            0x24 => Ok(Self::MaximumQoS),
            0x25 => Ok(Self::RetainAvailable),
            0x26 => Ok(Self::UserProperty),
            0x27 => Ok(Self::MaximumPacketSize),
            0x28 => Ok(Self::WildcardSubscriptionAvailable),
            0x29 => Ok(Self::SubscriptionIdentifierAvailable),
            0x2a => Ok(Self::SharedSubscriptionAvailable),
            _ => Err(DecodeError::InvalidPropertyType),
        }
    }
}

/// A property: identifier tag plus its typed value.
///
/// Each variant carries the data carrier the registry assigns to its id, so
/// type errors are unrepresentable after decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    /// 0 for unspecified bytes, 1 for UTF-8 payload.
    ///
    /// Used in PUBLISH and will properties.
    PayloadFormatIndicator(BoolData),

    /// Lifetime of the message in seconds.
    MessageExpiryInterval(U32Data),

    /// MIME-style description of the payload, defined by the applications.
    ContentType(StringData),

    /// Topic name for a response message; marks the message as a request.
    ResponseTopic(PubTopic),

    /// Opaque data the requester uses to match a response to its request.
    CorrelationData(BinaryData),

    /// Identifier of the matching subscription, 1..=268,435,455.
    SubscriptionIdentifier(VarInt),

    /// Session lifetime in seconds after the network connection closes.
    /// 0xFFFF_FFFF means the session does not expire.
    SessionExpiryInterval(U32Data),

    /// Client identifier chosen by the server when the CONNECT carried a
    /// zero-length one.
    AssignedClientIdentifier(StringData),

    /// Keep-alive the client must use instead of the one it sent.
    ServerKeepAlive(U16Data),

    /// Name of the extended authentication method.
    AuthenticationMethod(StringData),

    /// Authentication data; meaning is defined by the method.
    AuthenticationData(BinaryData),

    /// Whether the server may send reason strings and user properties on
    /// failures. Defaults to 1.
    RequestProblemInformation(BoolData),

    /// Delay in seconds before the will message is published.
    WillDelayInterval(U32Data),

    /// Whether the server may return response information in CONNACK.
    /// Defaults to 0.
    RequestResponseInformation(BoolData),

    /// Basis the client uses to build a response topic.
    ResponseInformation(StringData),

    /// Another server the client can use, sent with UseAnotherServer or
    /// ServerMoved.
    ServerReference(StringData),

    /// Human-readable diagnostic associated with this outcome.
    ReasonString(StringData),

    /// Number of QoS 1 and 2 publications the sender will process
    /// concurrently. Never 0; defaults to 65,535.
    ReceiveMaximum(U16Data),

    /// Highest topic alias the sender accepts. Defaults to 0.
    TopicAliasMaximum(U16Data),

    /// Integer standing in for the topic name on this connection.
    TopicAlias(U16Data),

    /// Highest QoS the server supports, 0 or 1.
    MaximumQoS(QoS),

    /// Whether the server supports retained messages.
    RetainAvailable(BoolData),

    /// Free-form name-value pair; may appear any number of times.
    UserProperty(StringPairData),

    /// Largest packet the sender is willing to accept. Never 0.
    MaximumPacketSize(U32Data),

    /// Whether the server supports wildcard subscriptions.
    WildcardSubscriptionAvailable(BoolData),

    /// Whether the server supports subscription identifiers.
    SubscriptionIdentifierAvailable(BoolData),

    /// Whether the server supports shared subscriptions.
    SharedSubscriptionAvailable(BoolData),
}

impl Property {
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::PayloadFormatIndicator(_) => PropertyType::PayloadFormatIndicator,
            Self::MessageExpiryInterval(_) => PropertyType::MessageExpiryInterval,
            Self::ContentType(_) => PropertyType::ContentType,
            Self::ResponseTopic(_) => PropertyType::ResponseTopic,
            Self::CorrelationData(_) => PropertyType::CorrelationData,
            Self::SubscriptionIdentifier(_) => PropertyType::SubscriptionIdentifier,
            Self::SessionExpiryInterval(_) => PropertyType::SessionExpiryInterval,
            Self::AssignedClientIdentifier(_) => PropertyType::AssignedClientIdentifier,
            Self::ServerKeepAlive(_) => PropertyType::ServerKeepAlive,
            Self::AuthenticationMethod(_) => PropertyType::AuthenticationMethod,
            Self::AuthenticationData(_) => PropertyType::AuthenticationData,
            Self::RequestProblemInformation(_) => PropertyType::RequestProblemInformation,
            Self::WillDelayInterval(_) => PropertyType::WillDelayInterval,
            Self::RequestResponseInformation(_) => PropertyType::RequestResponseInformation,
            Self::ResponseInformation(_) => PropertyType::ResponseInformation,
            Self::ServerReference(_) => PropertyType::ServerReference,
            Self::ReasonString(_) => PropertyType::ReasonString,
            Self::ReceiveMaximum(_) => PropertyType::ReceiveMaximum,
            Self::TopicAliasMaximum(_) => PropertyType::TopicAliasMaximum,
            Self::TopicAlias(_) => PropertyType::TopicAlias,
            Self::MaximumQoS(_) => PropertyType::MaximumQoS,
            Self::RetainAvailable(_) => PropertyType::RetainAvailable,
            Self::UserProperty(_) => PropertyType::UserProperty,
            Self::MaximumPacketSize(_) => PropertyType::MaximumPacketSize,
            Self::WildcardSubscriptionAvailable(_) => PropertyType::WildcardSubscriptionAvailable,
            Self::SubscriptionIdentifierAvailable(_) => {
                PropertyType::SubscriptionIdentifierAvailable
            }
            Self::SharedSubscriptionAvailable(_) => PropertyType::SharedSubscriptionAvailable,
        }
    }

    /// Byte length in packet, identifier included.
    #[must_use]
    pub fn bytes(&self) -> usize {
        let value_bytes = match self {
            Self::ContentType(v)
            | Self::AssignedClientIdentifier(v)
            | Self::AuthenticationMethod(v)
            | Self::ResponseInformation(v)
            | Self::ServerReference(v)
            | Self::ReasonString(v) => v.bytes(),
            Self::ResponseTopic(v) => v.bytes(),
            Self::CorrelationData(v) | Self::AuthenticationData(v) => v.bytes(),
            Self::UserProperty(v) => v.bytes(),
            Self::SubscriptionIdentifier(v) => v.bytes(),
            Self::PayloadFormatIndicator(_)
            | Self::RequestProblemInformation(_)
            | Self::RequestResponseInformation(_)
            | Self::RetainAvailable(_)
            | Self::WildcardSubscriptionAvailable(_)
            | Self::SubscriptionIdentifierAvailable(_)
            | Self::SharedSubscriptionAvailable(_) => BoolData::bytes(),
            Self::MaximumQoS(_) => QoS::bytes(),
            Self::ServerKeepAlive(_)
            | Self::ReceiveMaximum(_)
            | Self::TopicAliasMaximum(_)
            | Self::TopicAlias(_) => U16Data::bytes(),
            Self::MessageExpiryInterval(_)
            | Self::SessionExpiryInterval(_)
            | Self::WillDelayInterval(_)
            | Self::MaximumPacketSize(_) => U32Data::bytes(),
        };
        PropertyType::bytes() + value_bytes
    }

    /// Decode the value following an already-read identifier.
    fn decode_value(
        property_type: PropertyType,
        ba: &mut ByteArray,
    ) -> Result<Self, DecodeError> {
        let property = match property_type {
            PropertyType::PayloadFormatIndicator => {
                Self::PayloadFormatIndicator(BoolData::decode(ba)?)
            }
            PropertyType::MessageExpiryInterval => {
                Self::MessageExpiryInterval(U32Data::decode(ba)?)
            }
            PropertyType::ContentType => Self::ContentType(StringData::decode(ba)?),
            PropertyType::ResponseTopic => Self::ResponseTopic(PubTopic::decode(ba)?),
            PropertyType::CorrelationData => Self::CorrelationData(BinaryData::decode(ba)?),
            PropertyType::SubscriptionIdentifier => {
                let id = VarInt::decode(ba)?;
                if id.is_empty() {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Self::SubscriptionIdentifier(id)
            }
            PropertyType::SessionExpiryInterval => {
                Self::SessionExpiryInterval(U32Data::decode(ba)?)
            }
            PropertyType::AssignedClientIdentifier => {
                Self::AssignedClientIdentifier(StringData::decode(ba)?)
            }
            PropertyType::ServerKeepAlive => Self::ServerKeepAlive(U16Data::decode(ba)?),
            PropertyType::AuthenticationMethod => {
                Self::AuthenticationMethod(StringData::decode(ba)?)
            }
            PropertyType::AuthenticationData => Self::AuthenticationData(BinaryData::decode(ba)?),
            PropertyType::RequestProblemInformation => {
                Self::RequestProblemInformation(BoolData::decode(ba)?)
            }
            PropertyType::WillDelayInterval => Self::WillDelayInterval(U32Data::decode(ba)?),
            PropertyType::RequestResponseInformation => {
                Self::RequestResponseInformation(BoolData::decode(ba)?)
            }
            PropertyType::ResponseInformation => {
                Self::ResponseInformation(StringData::decode(ba)?)
            }
            PropertyType::ServerReference => Self::ServerReference(StringData::decode(ba)?),
            PropertyType::ReasonString => Self::ReasonString(StringData::decode(ba)?),
            PropertyType::ReceiveMaximum => Self::ReceiveMaximum(U16Data::decode(ba)?),
            PropertyType::TopicAliasMaximum => Self::TopicAliasMaximum(U16Data::decode(ba)?),
            PropertyType::TopicAlias => Self::TopicAlias(U16Data::decode(ba)?),
            PropertyType::MaximumQoS => {
                let qos = QoS::decode(ba)?;
                if qos == QoS::ExactOnce {
                    return Err(DecodeError::InvalidPropertyValue);
                }
                Self::MaximumQoS(qos)
            }
            PropertyType::RetainAvailable => Self::RetainAvailable(BoolData::decode(ba)?),
            PropertyType::UserProperty => Self::UserProperty(StringPairData::decode(ba)?),
            PropertyType::MaximumPacketSize => Self::MaximumPacketSize(U32Data::decode(ba)?),
            PropertyType::WildcardSubscriptionAvailable => {
                Self::WildcardSubscriptionAvailable(BoolData::decode(ba)?)
            }
            PropertyType::SubscriptionIdentifierAvailable => {
                Self::SubscriptionIdentifierAvailable(BoolData::decode(ba)?)
            }
            PropertyType::SharedSubscriptionAvailable => {
                Self::SharedSubscriptionAvailable(BoolData::decode(ba)?)
            }
        };
        Ok(property)
    }
}

impl EncodePacket for Property {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        buf.push(self.property_type() as u8);
        let value_bytes = match self {
            Self::PayloadFormatIndicator(v)
            | Self::RequestProblemInformation(v)
            | Self::RequestResponseInformation(v)
            | Self::RetainAvailable(v)
            | Self::WildcardSubscriptionAvailable(v)
            | Self::SubscriptionIdentifierAvailable(v)
            | Self::SharedSubscriptionAvailable(v) => v.encode(buf)?,
            Self::MaximumQoS(v) => v.encode(buf)?,
            Self::ServerKeepAlive(v)
            | Self::ReceiveMaximum(v)
            | Self::TopicAliasMaximum(v)
            | Self::TopicAlias(v) => v.encode(buf)?,
            Self::MessageExpiryInterval(v)
            | Self::SessionExpiryInterval(v)
            | Self::WillDelayInterval(v)
            | Self::MaximumPacketSize(v) => v.encode(buf)?,
            Self::ContentType(v)
            | Self::AssignedClientIdentifier(v)
            | Self::AuthenticationMethod(v)
            | Self::ResponseInformation(v)
            | Self::ServerReference(v)
            | Self::ReasonString(v) => v.encode(buf)?,
            Self::ResponseTopic(v) => v.encode(buf)?,
            Self::CorrelationData(v) | Self::AuthenticationData(v) => v.encode(buf)?,
            Self::UserProperty(v) => v.encode(buf)?,
            Self::SubscriptionIdentifier(v) => v.encode(buf)?,
        };
        Ok(PropertyType::bytes() + value_bytes)
    }
}

/// Ordered property list preceded by its byte length as a variable byte
/// integer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Properties(Vec<Property>);

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn props(&self) -> &[Property] {
        &self.0
    }

    /// Byte length of the property data, without the length prefix.
    fn data_bytes(&self) -> usize {
        self.0.iter().map(Property::bytes).sum()
    }

    /// Byte length in packet: length prefix plus property data.
    #[must_use]
    pub fn bytes(&self) -> usize {
        let data = self.data_bytes();
        #[allow(clippy::cast_possible_truncation)]
        let prefix = VarInt::size_of(data as u32);
        prefix + data
    }

    /// Append a property.
    ///
    /// # Errors
    ///
    /// Returns error if the list would no longer fit its length prefix.
    pub fn push(&mut self, property: Property) -> Result<(), EncodeError> {
        let data = self.data_bytes() + property.bytes();
        let data = u32::try_from(data).map_err(|_err| EncodeError::TooManyData)?;
        let _prefix = VarInt::from(data)?;
        self.0.push(property);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Walk a property list for the given packet kind.
    ///
    /// Each identifier is checked for membership before its value is
    /// parsed; a unique identifier seen twice is a protocol error. The walk
    /// must consume exactly the declared byte length.
    ///
    /// # Errors
    ///
    /// Returns error on unknown or forbidden ids, duplicates, or a length
    /// prefix that disagrees with the data.
    pub fn decode_for(ba: &mut ByteArray, packet: PacketType) -> Result<Self, DecodeError> {
        Self::decode_with(ba, |id| id.allowed_in(&packet))
    }

    /// Walk the will property list of a CONNECT packet.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Properties::decode_for`].
    pub fn decode_will(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        Self::decode_with(ba, PropertyType::allowed_in_will)
    }

    fn decode_with(
        ba: &mut ByteArray,
        allowed: impl Fn(PropertyType) -> bool,
    ) -> Result<Self, DecodeError> {
        // A missing property length in an otherwise empty tail means an
        // empty list.
        if ba.remaining() == 0 {
            return Ok(Self::new());
        }

        let declared = VarInt::decode(ba)?.value() as usize;
        if declared > ba.remaining() {
            return Err(DecodeError::OutOfRange);
        }
        let end = ba.offset() + declared;

        // Property ids fit in six bits, so one word tracks duplicates.
        let mut seen: u64 = 0;
        let mut properties = Vec::new();
        while ba.offset() < end {
            let property_type = PropertyType::try_from(ba.read_byte()?)?;
            if !allowed(property_type) {
                log::error!("property: {property_type:?} not allowed here");
                return Err(DecodeError::InvalidPropertyType);
            }
            let mask = 1_u64 << (property_type as u8);
            if property_type.is_unique() && seen & mask != 0 {
                log::error!("property: duplicate {property_type:?}");
                return Err(DecodeError::DuplicateProperty);
            }
            seen |= mask;
            properties.push(Property::decode_value(property_type, ba)?);
        }

        // A property value running past the declared length is malformed.
        if ba.offset() != end {
            return Err(DecodeError::InvalidRemainingLength);
        }
        Ok(Self(properties))
    }
}

impl AsRef<[Property]> for Properties {
    fn as_ref(&self) -> &[Property] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl EncodePacket for Properties {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let data = self.data_bytes();
        let data = u32::try_from(data).map_err(|_err| EncodeError::TooManyData)?;
        let prefix = VarInt::from(data)?;
        let mut written = prefix.encode(buf)?;
        for property in &self.0 {
            written += property.encode(buf)?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_data_types() {
        assert_eq!(
            PropertyType::SessionExpiryInterval.data_type(),
            DataType::FourByteInt
        );
        assert_eq!(PropertyType::ReceiveMaximum.data_type(), DataType::TwoByteInt);
        assert_eq!(
            PropertyType::UserProperty.data_type(),
            DataType::Utf8StringPair
        );
        assert_eq!(
            PropertyType::SubscriptionIdentifier.data_type(),
            DataType::VarByteInt
        );
        assert_eq!(
            PropertyType::AuthenticationData.data_type(),
            DataType::BinaryData
        );
    }

    #[test]
    fn test_registry_fixed_sizes() {
        assert_eq!(DataType::Byte.fixed_size(), Some(1));
        assert_eq!(DataType::TwoByteInt.fixed_size(), Some(2));
        assert_eq!(DataType::FourByteInt.fixed_size(), Some(4));
        assert_eq!(DataType::Utf8String.fixed_size(), None);
    }

    #[test]
    fn test_registry_uniqueness() {
        assert!(PropertyType::SessionExpiryInterval.is_unique());
        assert!(!PropertyType::UserProperty.is_unique());
        assert!(!PropertyType::SubscriptionIdentifier.is_unique());
    }

    #[test]
    fn test_registry_membership() {
        assert!(PropertyType::SessionExpiryInterval.allowed_in(&PacketType::Connect));
        assert!(PropertyType::ReceiveMaximum.allowed_in(&PacketType::ConnectAck));
        assert!(!PropertyType::TopicAlias.allowed_in(&PacketType::Connect));
        assert!(!PropertyType::MaximumQoS.allowed_in(&PacketType::Connect));
        assert!(PropertyType::WillDelayInterval.allowed_in_will());
        assert!(!PropertyType::SessionExpiryInterval.allowed_in_will());
    }

    #[test]
    fn test_decode_connect_properties() {
        // session-expiry 16, receive-maximum 20.
        let buf = [0x08, 0x11, 0x00, 0x00, 0x00, 0x10, 0x21, 0x00, 0x14];
        let mut ba = ByteArray::new(&buf);
        let properties = Properties::decode_for(&mut ba, PacketType::Connect).unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(
            properties.props()[0],
            Property::SessionExpiryInterval(U32Data::new(16))
        );
    }

    #[test]
    fn test_decode_rejects_foreign_property() {
        // topic-alias in a CONNECT list.
        let buf = [0x03, 0x23, 0x00, 0x01];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_for(&mut ba, PacketType::Connect),
            Err(DecodeError::InvalidPropertyType)
        );
    }

    #[test]
    fn test_decode_rejects_duplicate_unique_property() {
        let buf = [
            0x0a, 0x11, 0x00, 0x00, 0x00, 0x10, 0x11, 0x00, 0x00, 0x00, 0x20,
        ];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_for(&mut ba, PacketType::Connect),
            Err(DecodeError::DuplicateProperty)
        );
    }

    #[test]
    fn test_decode_allows_repeated_user_property() {
        let buf = [
            0x0e, //
            0x26, 0x00, 0x01, b'a', 0x00, 0x01, b'b', //
            0x26, 0x00, 0x01, b'a', 0x00, 0x01, b'c',
        ];
        let mut ba = ByteArray::new(&buf);
        let properties = Properties::decode_for(&mut ba, PacketType::Connect).unwrap();
        assert_eq!(properties.len(), 2);
    }

    #[test]
    fn test_decode_rejects_overrunning_value() {
        // Declared length 2, but the u32 value needs 4 bytes.
        let buf = [0x02, 0x11, 0x00, 0x00, 0x00, 0x10];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_for(&mut ba, PacketType::Connect),
            Err(DecodeError::InvalidRemainingLength)
        );
    }

    #[test]
    fn test_decode_rejects_truncated_list() {
        let buf = [0x08, 0x11, 0x00, 0x00];
        let mut ba = ByteArray::new(&buf);
        assert_eq!(
            Properties::decode_for(&mut ba, PacketType::Connect),
            Err(DecodeError::OutOfRange)
        );
    }

    #[test]
    fn test_encode_roundtrip() {
        let mut properties = Properties::new();
        properties
            .push(Property::SessionExpiryInterval(U32Data::new(300)))
            .unwrap();
        properties
            .push(Property::ReceiveMaximum(U16Data::new(32)))
            .unwrap();
        let mut buf = Vec::new();
        let written = properties.encode(&mut buf).unwrap();
        assert_eq!(written, properties.bytes());

        let mut ba = ByteArray::new(&buf);
        let decoded = Properties::decode_for(&mut ba, PacketType::Connect).unwrap();
        assert_eq!(decoded, properties);
    }

    #[test]
    fn test_empty_tail_is_empty_list() {
        let buf = [];
        let mut ba = ByteArray::new(&buf);
        let properties = Properties::decode_for(&mut ba, PacketType::Disconnect).unwrap();
        assert!(properties.is_empty());
    }
}
