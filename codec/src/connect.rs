// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use crate::utils::validate_client_id;
use crate::{
    BinaryData, ByteArray, ConnectFlags, DataType, DecodeError, DecodePacket, EncodeError,
    EncodePacket, FixedHeader, Packet, PacketType, Properties, PubTopic, QoS, StringData,
    PROTOCOL_LEVEL, PROTOCOL_NAME,
};

/// Payload fields of a CONNECT packet, in their declared wire order.
///
/// Which of them are present is driven by the connect flags; the client id
/// is always first and always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadField {
    ClientId,
    WillProperties,
    WillTopic,
    WillPayload,
    UserName,
    Password,
}

/// The declared field order of the CONNECT payload.
pub const CONNECT_PAYLOAD_FIELDS: &[PayloadField] = &[
    PayloadField::ClientId,
    PayloadField::WillProperties,
    PayloadField::WillTopic,
    PayloadField::WillPayload,
    PayloadField::UserName,
    PayloadField::Password,
];

impl PayloadField {
    /// Wire type of the field; `None` for the nested will property list.
    #[must_use]
    pub const fn data_type(self) -> Option<DataType> {
        match self {
            Self::ClientId | Self::WillTopic | Self::UserName => Some(DataType::Utf8String),
            Self::WillPayload | Self::Password => Some(DataType::BinaryData),
            Self::WillProperties => None,
        }
    }

    /// Whether the connect flags mark this field as present.
    #[must_use]
    pub const fn present(self, flags: &ConnectFlags) -> bool {
        match self {
            Self::ClientId => true,
            Self::WillProperties | Self::WillTopic | Self::WillPayload => flags.will(),
            Self::UserName => flags.has_username(),
            Self::Password => flags.has_password(),
        }
    }
}

/// CONNECT is the first packet a client sends on a new connection.
///
/// Variable header: protocol name "MQTT", protocol level 5, connect flags,
/// keep-alive and properties. The payload holds the fields of
/// [`CONNECT_PAYLOAD_FIELDS`] gated by the flags.
///
/// ```txt
///  7                          0
/// +----------------------------+
/// | Fixed header               |
/// +----------------------------+
/// | Protocol name length (= 4) |
/// | "MQTT"                     |
/// +----------------------------+
/// | Protocol level (= 5)       |
/// +----------------------------+
/// | Connect flags              |
/// +----------------------------+
/// | Keep alive                 |
/// +----------------------------+
/// | Properties                 |
/// +----------------------------+
/// | Payload fields ...         |
/// +----------------------------+
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectPacket {
    connect_flags: ConnectFlags,

    /// Longest silence the client promises between control packets, in
    /// seconds. 0 turns keep-alive off.
    keep_alive: u16,

    properties: Properties,

    /// First payload field. May be empty when clean-start is set; the
    /// server then assigns an id and reports it in the CONNACK.
    client_id: StringData,

    will_properties: Properties,
    will_topic: Option<PubTopic>,
    will_message: BinaryData,
    username: StringData,
    password: BinaryData,
}

impl ConnectPacket {
    /// Create a packet with the given client id.
    ///
    /// # Errors
    ///
    /// Returns error if `client_id` is invalid.
    pub fn new(client_id: &str) -> Result<Self, EncodeError> {
        validate_client_id(client_id).map_err(|_err| EncodeError::InvalidClientId)?;
        Ok(Self {
            client_id: StringData::from(client_id)?,
            keep_alive: 60,
            ..Self::default()
        })
    }

    #[must_use]
    #[inline]
    pub const fn connect_flags(&self) -> &ConnectFlags {
        &self.connect_flags
    }

    #[must_use]
    pub const fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn set_keep_alive(&mut self, keep_alive: u16) -> &mut Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub const fn clean_start(&self) -> bool {
        self.connect_flags.clean_start()
    }

    pub fn set_clean_start(&mut self, clean_start: bool) -> &mut Self {
        self.connect_flags.set_clean_start(clean_start);
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_ref()
    }

    /// Replace the client id.
    ///
    /// # Errors
    ///
    /// Returns error if `client_id` is invalid.
    pub fn set_client_id(&mut self, client_id: &str) -> Result<&mut Self, EncodeError> {
        validate_client_id(client_id).map_err(|_err| EncodeError::InvalidClientId)?;
        self.client_id = StringData::from(client_id)?;
        Ok(self)
    }

    #[must_use]
    pub const fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    #[must_use]
    pub const fn will_properties(&self) -> &Properties {
        &self.will_properties
    }

    pub fn will_properties_mut(&mut self) -> &mut Properties {
        &mut self.will_properties
    }

    #[must_use]
    pub fn will_topic(&self) -> Option<&str> {
        self.will_topic.as_ref().map(AsRef::as_ref)
    }

    /// Set the will topic and raise the will flag.
    ///
    /// # Errors
    ///
    /// Returns error if `topic` is invalid.
    pub fn set_will(
        &mut self,
        topic: &str,
        message: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<&mut Self, EncodeError> {
        self.will_topic = Some(PubTopic::new(topic)?);
        self.will_message = BinaryData::from_slice(message)?;
        self.connect_flags.set_will(true);
        self.connect_flags.set_will_qos(qos);
        self.connect_flags.set_will_retain(retain);
        Ok(self)
    }

    #[must_use]
    pub fn will_message(&self) -> &[u8] {
        self.will_message.as_ref()
    }

    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_ref()
    }

    /// # Errors
    ///
    /// Returns error if `username` is too long or ill-formed.
    pub fn set_username(&mut self, username: &str) -> Result<&mut Self, EncodeError> {
        self.username = StringData::from(username)?;
        self.connect_flags.set_has_username(true);
        Ok(self)
    }

    #[must_use]
    pub fn password(&self) -> &[u8] {
        self.password.as_ref()
    }

    /// # Errors
    ///
    /// Returns error if `password` is too long.
    pub fn set_password(&mut self, password: &[u8]) -> Result<&mut Self, EncodeError> {
        self.password = BinaryData::from_slice(password)?;
        self.connect_flags.set_has_password(true);
        Ok(self)
    }

    fn remaining_length(&self) -> usize {
        let mut len = 2 + PROTOCOL_NAME.len()  // protocol name with prefix
            + 1                                // protocol level
            + ConnectFlags::bytes()
            + 2                                // keep alive
            + self.properties.bytes()
            + self.client_id.bytes();

        if self.connect_flags.will() {
            len += self.will_properties.bytes();
            if let Some(will_topic) = &self.will_topic {
                len += will_topic.bytes();
            }
            len += self.will_message.bytes();
        }
        if self.connect_flags.has_username() {
            len += self.username.bytes();
        }
        if self.connect_flags.has_password() {
            len += self.password.bytes();
        }
        len
    }
}

impl DecodePacket for ConnectPacket {
    fn decode(ba: &mut ByteArray) -> Result<Self, DecodeError> {
        let fixed_header = FixedHeader::decode(ba)?;
        if fixed_header.packet_type() != PacketType::Connect {
            return Err(DecodeError::InvalidPacketType);
        }

        // The protocol name is length-prefixed like a string but compared
        // as raw bytes; its length must be exactly 4.
        let name_len = ba.read_u16()?;
        if name_len as usize != PROTOCOL_NAME.len() {
            return Err(DecodeError::InvalidProtocolName);
        }
        let name = ba.read_bytes(PROTOCOL_NAME.len())?;
        if name != PROTOCOL_NAME.as_bytes() {
            return Err(DecodeError::InvalidProtocolName);
        }

        // Only protocol level 5 is served here.
        let protocol_level = ba.read_byte()?;
        if protocol_level != PROTOCOL_LEVEL {
            return Err(DecodeError::InvalidProtocolLevel);
        }

        let connect_flags = ConnectFlags::decode(ba)?;
        let keep_alive = ba.read_u16()?;
        let properties = Properties::decode_for(ba, PacketType::Connect)?;

        let mut packet = Self {
            connect_flags,
            keep_alive,
            properties,
            ..Self::default()
        };

        for field in CONNECT_PAYLOAD_FIELDS {
            if !field.present(&packet.connect_flags) {
                continue;
            }
            match field {
                PayloadField::ClientId => {
                    let client_id = StringData::decode(ba)?;
                    if client_id.is_empty() && !packet.connect_flags.clean_start() {
                        // Resuming a session requires a client id.
                        return Err(DecodeError::InvalidClientId);
                    }
                    validate_client_id(client_id.as_ref())?;
                    packet.client_id = client_id;
                }
                PayloadField::WillProperties => {
                    packet.will_properties = Properties::decode_will(ba)?;
                }
                PayloadField::WillTopic => {
                    packet.will_topic = Some(PubTopic::decode(ba)?);
                }
                PayloadField::WillPayload => {
                    packet.will_message = BinaryData::decode(ba)?;
                }
                PayloadField::UserName => {
                    packet.username = StringData::decode(ba)?;
                }
                PayloadField::Password => {
                    packet.password = BinaryData::decode(ba)?;
                }
            }
        }

        // The payload walk must land exactly on the declared packet end.
        if ba.offset() != fixed_header.bytes() + fixed_header.remaining_length() {
            return Err(DecodeError::InvalidRemainingLength);
        }

        Ok(packet)
    }
}

impl EncodePacket for ConnectPacket {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<usize, EncodeError> {
        let old_len = buf.len();

        let fixed_header = FixedHeader::new(PacketType::Connect, self.remaining_length())?;
        fixed_header.encode(buf)?;

        StringData::from(PROTOCOL_NAME)?.encode(buf)?;
        buf.push(PROTOCOL_LEVEL);
        self.connect_flags.encode(buf)?;
        buf.extend_from_slice(&self.keep_alive.to_be_bytes());
        self.properties.encode(buf)?;

        self.client_id.encode(buf)?;
        if self.connect_flags.will() {
            self.will_properties.encode(buf)?;
            if let Some(will_topic) = &self.will_topic {
                will_topic.encode(buf)?;
            }
            self.will_message.encode(buf)?;
        }
        if self.connect_flags.has_username() {
            self.username.encode(buf)?;
        }
        if self.connect_flags.has_password() {
            self.password.encode(buf)?;
        }

        Ok(buf.len() - old_len)
    }
}

impl Packet for ConnectPacket {
    fn packet_type(&self) -> PacketType {
        PacketType::Connect
    }
}
