// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use codec::{ConnectPacket, Property, QoS, ReasonCode};

/// Will-message settings collected from the CONNECT payload.
///
/// Created only when the will flag is set; a will property arriving without
/// it is a malformed packet.
#[derive(Debug, Default, Clone)]
pub struct WillConfig {
    qos: QoS,
    retain: bool,
    delay_interval: u32,
    payload_format_indicator: bool,
    message_expiry_interval: Option<u32>,
    content_type: Option<String>,
    response_topic: Option<String>,
    correlation_data: Option<Vec<u8>>,
    user_properties: Vec<(String, String)>,
    topic: String,
    payload: Vec<u8>,
}

impl WillConfig {
    #[must_use]
    pub const fn qos(&self) -> QoS {
        self.qos
    }

    #[must_use]
    pub const fn retain(&self) -> bool {
        self.retain
    }

    #[must_use]
    pub const fn delay_interval(&self) -> u32 {
        self.delay_interval
    }

    #[must_use]
    pub const fn payload_format_indicator(&self) -> bool {
        self.payload_format_indicator
    }

    #[must_use]
    pub const fn message_expiry_interval(&self) -> Option<u32> {
        self.message_expiry_interval
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn response_topic(&self) -> Option<&str> {
        self.response_topic.as_deref()
    }

    #[must_use]
    pub fn correlation_data(&self) -> Option<&[u8]> {
        self.correlation_data.as_deref()
    }

    #[must_use]
    pub fn user_properties(&self) -> &[(String, String)] {
        &self.user_properties
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Per-client data store populated while a CONNECT packet is processed and
/// consulted when the CONNACK is assembled.
///
/// Owned exclusively by the connection; the packet handlers borrow it
/// mutably. All appliers leave the record untouched when they reject a
/// value.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    client_id: String,

    /// Set when the broker generated the id because the client sent an
    /// empty one; reported back via the assigned-client-identifier
    /// property.
    assigned_client_id: bool,

    clean_start: bool,

    /// Seconds of allowed silence; 0 means infinite.
    keep_alive: u16,

    session_expiry_interval: Option<u32>,
    receive_maximum: Option<u16>,
    maximum_packet_size: Option<u32>,
    topic_alias_maximum: u16,
    request_response_information: bool,
    request_problem_information: bool,
    user_properties: Vec<(String, String)>,
    auth_method: Option<String>,
    auth_data: Option<Vec<u8>>,
    username: Option<String>,
    password: Option<Vec<u8>>,
    will: Option<WillConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            assigned_client_id: false,
            clean_start: true,
            keep_alive: 0,
            session_expiry_interval: None,
            receive_maximum: None,
            maximum_packet_size: None,
            topic_alias_maximum: 0,
            request_response_information: false,
            // Absent means the client accepts diagnostics.
            request_problem_information: true,
            user_properties: Vec::new(),
            auth_method: None,
            auth_data: None,
            username: None,
            password: None,
            will: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Store a broker-generated client id.
    pub fn assign_client_id(&mut self, client_id: String) {
        self.client_id = client_id;
        self.assigned_client_id = true;
    }

    #[must_use]
    pub const fn assigned_client_id(&self) -> bool {
        self.assigned_client_id
    }

    #[must_use]
    pub const fn clean_start(&self) -> bool {
        self.clean_start
    }

    pub fn set_clean_start(&mut self, clean_start: bool) {
        self.clean_start = clean_start;
    }

    #[must_use]
    pub const fn keep_alive(&self) -> u16 {
        self.keep_alive
    }

    pub fn set_keep_alive(&mut self, keep_alive: u16) {
        self.keep_alive = keep_alive;
    }

    #[must_use]
    pub const fn session_expiry_interval(&self) -> Option<u32> {
        self.session_expiry_interval
    }

    #[must_use]
    pub const fn receive_maximum(&self) -> Option<u16> {
        self.receive_maximum
    }

    #[must_use]
    pub const fn maximum_packet_size(&self) -> Option<u32> {
        self.maximum_packet_size
    }

    #[must_use]
    pub const fn topic_alias_maximum(&self) -> u16 {
        self.topic_alias_maximum
    }

    #[must_use]
    pub const fn request_response_information(&self) -> bool {
        self.request_response_information
    }

    #[must_use]
    pub const fn request_problem_information(&self) -> bool {
        self.request_problem_information
    }

    #[must_use]
    pub fn user_properties(&self) -> &[(String, String)] {
        &self.user_properties
    }

    #[must_use]
    pub fn auth_method(&self) -> Option<&str> {
        self.auth_method.as_deref()
    }

    #[must_use]
    pub fn auth_data(&self) -> Option<&[u8]> {
        self.auth_data.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&[u8]> {
        self.password.as_deref()
    }

    #[must_use]
    pub const fn will(&self) -> Option<&WillConfig> {
        self.will.as_ref()
    }

    /// Create the empty will record; required before any will property or
    /// will payload field is applied.
    pub fn init_will(&mut self, qos: QoS, retain: bool) {
        self.will = Some(WillConfig {
            qos,
            retain,
            ..WillConfig::default()
        });
    }

    /// Store one CONNECT property.
    ///
    /// # Errors
    ///
    /// Returns the MQTT-visible reason when the value is invalid:
    /// receive-maximum and maximum-packet-size must not be 0, and
    /// authentication data needs an authentication method first.
    pub fn apply_property(&mut self, property: &Property) -> Result<(), ReasonCode> {
        match property {
            Property::SessionExpiryInterval(interval) => {
                self.session_expiry_interval = Some(interval.value());
            }
            Property::ReceiveMaximum(maximum) => {
                if maximum.value() == 0 {
                    return Err(ReasonCode::ProtocolError);
                }
                self.receive_maximum = Some(maximum.value());
            }
            Property::MaximumPacketSize(maximum) => {
                if maximum.value() == 0 {
                    return Err(ReasonCode::ProtocolError);
                }
                self.maximum_packet_size = Some(maximum.value());
            }
            Property::TopicAliasMaximum(maximum) => {
                self.topic_alias_maximum = maximum.value();
            }
            Property::RequestResponseInformation(on) => {
                self.request_response_information = on.value();
            }
            Property::RequestProblemInformation(on) => {
                self.request_problem_information = on.value();
            }
            Property::UserProperty(pair) => {
                self.user_properties
                    .push((pair.key().to_string(), pair.value().to_string()));
            }
            Property::AuthenticationMethod(method) => {
                self.auth_method = Some(method.to_string());
            }
            Property::AuthenticationData(data) => {
                if self.auth_method.is_none() {
                    return Err(ReasonCode::ProtocolError);
                }
                self.auth_data = Some(data.as_ref().to_vec());
            }
            _ => return Err(ReasonCode::ProtocolError),
        }
        Ok(())
    }

    /// Store one will property.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPacket` when no will record exists, or
    /// `ProtocolError` for a property that does not belong here.
    pub fn apply_will_property(&mut self, property: &Property) -> Result<(), ReasonCode> {
        let Some(will) = self.will.as_mut() else {
            // A will property without the will flag.
            return Err(ReasonCode::MalformedPacket);
        };
        match property {
            Property::WillDelayInterval(interval) => {
                will.delay_interval = interval.value();
            }
            Property::PayloadFormatIndicator(on) => {
                will.payload_format_indicator = on.value();
            }
            Property::MessageExpiryInterval(interval) => {
                will.message_expiry_interval = Some(interval.value());
            }
            Property::ContentType(content_type) => {
                will.content_type = Some(content_type.to_string());
            }
            Property::ResponseTopic(topic) => {
                will.response_topic = Some(topic.as_ref().to_string());
            }
            Property::CorrelationData(data) => {
                will.correlation_data = Some(data.as_ref().to_vec());
            }
            Property::UserProperty(pair) => {
                will.user_properties
                    .push((pair.key().to_string(), pair.value().to_string()));
            }
            _ => return Err(ReasonCode::ProtocolError),
        }
        Ok(())
    }

    /// Thread the decoded payload fields into the record, honouring the
    /// connect flags.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPacket` if the will flag and the will fields
    /// disagree.
    pub fn apply_payload(&mut self, packet: &ConnectPacket) -> Result<(), ReasonCode> {
        self.client_id = packet.client_id().to_string();
        let flags = packet.connect_flags();
        if flags.will() {
            let Some(will) = self.will.as_mut() else {
                return Err(ReasonCode::MalformedPacket);
            };
            let Some(topic) = packet.will_topic() else {
                return Err(ReasonCode::MalformedPacket);
            };
            will.topic = topic.to_string();
            will.payload = packet.will_message().to_vec();
        }
        if flags.has_username() {
            self.username = Some(packet.username().to_string());
        }
        if flags.has_password() {
            self.password = Some(packet.password().to_vec());
        }
        Ok(())
    }
}
