// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use codec::{
    BoolData, ConnectAckPacket, ConnectPacket, Property, QoS, ReasonCode, StringData, U16Data,
    U32Data,
};

use super::Session;
use crate::error::Error;

impl Session {
    /// Thread a decoded CONNECT through the client configuration: connect
    /// flags, keep-alive, packet properties, will properties and payload
    /// fields, in that order.
    ///
    /// The first rejected value wins; the returned reason is what the
    /// error CONNACK carries.
    pub(super) fn configure_client(&mut self, packet: &ConnectPacket) -> Result<(), ReasonCode> {
        let flags = packet.connect_flags();
        self.client.set_clean_start(flags.clean_start());
        self.client.set_keep_alive(packet.keep_alive());

        for property in packet.properties() {
            self.client.apply_property(property)?;
        }

        if flags.will() {
            self.client.init_will(flags.will_qos(), flags.will_retain());
            for property in packet.will_properties() {
                self.client.apply_will_property(property)?;
            }
        }

        self.client.apply_payload(packet)
    }

    /// Assemble the success CONNACK from the negotiated configuration.
    ///
    /// Session state is not persisted across connections, so the
    /// session-present flag is always clear.
    pub(super) fn build_connect_ack(
        &self,
        server_keep_alive: Option<u16>,
    ) -> Result<ConnectAckPacket, Error> {
        let mut ack = ConnectAckPacket::new(false, ReasonCode::Success);
        let properties = ack.properties_mut();

        if let Some(interval) = self.client.session_expiry_interval() {
            properties.push(Property::SessionExpiryInterval(U32Data::new(interval)))?;
        }
        properties.push(Property::ReceiveMaximum(U16Data::new(u16::MAX)))?;
        if self.config.maximum_qos() < QoS::ExactOnce {
            properties.push(Property::MaximumQoS(self.config.maximum_qos()))?;
        }
        // Retained messages and every subscription feature are not served
        // yet; say so instead of failing later.
        properties.push(Property::RetainAvailable(BoolData::new(false)))?;
        properties.push(Property::MaximumPacketSize(U32Data::new(
            self.config.maximum_packet_size(),
        )))?;
        if self.client.assigned_client_id() {
            properties.push(Property::AssignedClientIdentifier(StringData::from(
                self.client.client_id(),
            )?))?;
        }
        properties.push(Property::TopicAliasMaximum(U16Data::new(0)))?;
        properties.push(Property::WildcardSubscriptionAvailable(BoolData::new(
            false,
        )))?;
        properties.push(Property::SubscriptionIdentifierAvailable(BoolData::new(
            false,
        )))?;
        properties.push(Property::SharedSubscriptionAvailable(BoolData::new(false)))?;
        if let Some(keep_alive) = server_keep_alive {
            properties.push(Property::ServerKeepAlive(U16Data::new(keep_alive)))?;
        }

        Ok(ack)
    }
}
