// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::convert::TryFrom;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::sync::Notify;

use codec::{
    ByteArray, ConnectAckPacket, ConnectPacket, DecodePacket, DisconnectPacket, EncodePacket,
    Packet, PacketType, PublishPacket, ReasonCode,
};

use crate::commands::SessionToDispatcherCmd;
use crate::error::{Error, ErrorKind};
use crate::queue::TsQueue;
use crate::stream::Stream;
use crate::timer::{AlarmTimer, TimerService};
use crate::types::SessionId;

mod client_config;
mod config;
mod properties;

pub use client_config::{ClientConfig, WillConfig};
pub use config::SessionConfig;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Accepted, CONNECT not yet processed.
    Invalid,

    /// CONNACK sent, packets flowing.
    Connected,

    /// Orderly DISCONNECT received, about to close.
    Disconnecting,

    /// Socket shut down.
    Disconnected,
}

#[derive(Debug)]
struct SessionShared {
    id: SessionId,
    shutdown: Notify,
    enqueued: AtomicBool,
}

/// Shared handle to one session: its id, its shutdown signal and its
/// once-only deletion marker.
///
/// Handles compare by identity, not by value, so registry erasure removes
/// exactly the connection that was handed in.
#[derive(Debug, Clone)]
pub struct SessionRef(Arc<SessionShared>);

impl SessionRef {
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self(Arc::new(SessionShared {
            id,
            shutdown: Notify::new(),
            enqueued: AtomicBool::new(false),
        }))
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.0.id
    }

    /// Ask the session task to stop reading and close.
    pub fn shutdown(&self) {
        self.0.shutdown.notify_one();
    }

    pub async fn wait_shutdown(&self) {
        self.0.shutdown.notified().await;
    }

    /// Returns true on the first call only.
    fn mark_enqueued(&self) -> bool {
        !self.0.enqueued.swap(true, Ordering::SeqCst)
    }
}

impl PartialEq for SessionRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SessionRef {}

/// One client connection: the socket, its negotiated client state and the
/// read loop driving both.
///
/// The session owns its [`ClientConfig`] exclusively; packet handlers
/// borrow it mutably. On any protocol error, orderly disconnect or
/// keep-alive expiry the session shuts the socket down and enqueues its
/// handle for deletion exactly once; the handle is popped and erased from
/// the active registry on the broker's main thread, never on the I/O
/// runtime.
pub struct Session {
    id: SessionId,
    shared: SessionRef,
    stream: Stream,
    config: SessionConfig,
    client: ClientConfig,
    status: Status,
    is_first_packet: bool,
    timer: AlarmTimer,
    deletion_queue: Arc<TsQueue<SessionRef>>,
    dispatcher_sender: Sender<SessionToDispatcherCmd>,
}

impl Session {
    #[must_use]
    pub fn new(
        shared: SessionRef,
        stream: Stream,
        config: SessionConfig,
        timer_service: &TimerService,
        deletion_queue: Arc<TsQueue<SessionRef>>,
        dispatcher_sender: Sender<SessionToDispatcherCmd>,
    ) -> Self {
        // The timer only signals; the read loop notices via its shutdown
        // arm and closes. Armed with the first-packet window until CONNECT
        // succeeds.
        let timer_handle = shared.clone();
        let connect_timeout = config.connect_timeout();
        let mut timer = timer_service.start(Duration::from_secs(connect_timeout.max(1)), move || {
            timer_handle.shutdown();
        });
        if connect_timeout == 0 {
            timer.stop();
        }

        Self {
            id: shared.id(),
            shared,
            stream,
            config,
            client: ClientConfig::new(),
            status: Status::Invalid,
            is_first_packet: true,
            timer,
            deletion_queue,
            dispatcher_sender,
        }
    }

    pub async fn run_loop(mut self) {
        let shared = self.shared.clone();
        loop {
            tokio::select! {
                () = shared.wait_shutdown() => {
                    log::info!("session {}: shutdown signalled", self.id);
                    break;
                }
                ret = self.read_packet() => {
                    match ret {
                        Ok((packet_type, packet)) => {
                            if let Err(err) = self.handle_packet(packet_type, &packet).await {
                                log::warn!("session {}: {err}", self.id);
                                break;
                            }
                            if self.status == Status::Disconnecting {
                                break;
                            }
                            self.rearm_timer();
                        }
                        Err(err) => {
                            log::debug!("session {}: read ended, {err}", self.id);
                            break;
                        }
                    }
                }
            }
        }
        self.close().await;
    }

    /// Read one complete packet: control byte, 1..4 remaining-length bytes,
    /// then a body of exactly that size.
    ///
    /// Returns the classified type and the full packet bytes.
    async fn read_packet(&mut self) -> Result<(PacketType, Vec<u8>), Error> {
        let control = self.stream.read_byte().await?;
        let packet_type = PacketType::try_from(control)?;

        // Until a CONNECT went through, nothing else is acceptable and no
        // reply is owed.
        if self.is_first_packet && !matches!(packet_type, PacketType::Connect) {
            return Err(Error::from_string(
                ErrorKind::StatusError,
                format!("first packet was {packet_type:?}, not CONNECT"),
            ));
        }

        let mut packet = vec![control];
        let mut remaining: u32 = 0;
        let mut multiplier: u32 = 1;
        loop {
            let byte = self.stream.read_byte().await?;
            packet.push(byte);
            remaining += u32::from(byte & 0x7f) * multiplier;
            if byte & 0x80 == 0 {
                break;
            }
            if multiplier == 0x0020_0000 {
                // A fifth length byte would be needed.
                return Err(Error::new(
                    ErrorKind::DecodeError,
                    "remaining length over four bytes",
                ));
            }
            multiplier *= 0x80;
        }

        // Enforced before a single body byte is read.
        if remaining > self.config.maximum_packet_size() {
            return Err(Error::from_string(
                ErrorKind::DecodeError,
                format!("remaining length {remaining} over packet size limit"),
            ));
        }

        let header_len = packet.len();
        packet.resize(header_len + remaining as usize, 0);
        self.stream.read_exact(&mut packet[header_len..]).await?;
        Ok((packet_type, packet))
    }

    async fn handle_packet(&mut self, packet_type: PacketType, buf: &[u8]) -> Result<(), Error> {
        match packet_type {
            PacketType::Connect => self.on_client_connect(buf).await,
            PacketType::Publish { .. } => self.on_client_publish(buf).await,
            PacketType::Disconnect => self.on_client_disconnect(buf),
            other => Err(Error::from_string(
                ErrorKind::StatusError,
                format!("unsupported packet type {other:?}"),
            )),
        }
    }

    async fn on_client_connect(&mut self, buf: &[u8]) -> Result<(), Error> {
        if self.status != Status::Invalid {
            return Err(Error::new(
                ErrorKind::StatusError,
                "second CONNECT on one connection",
            ));
        }
        self.is_first_packet = false;

        // Wire-level failures close the socket without a reply.
        let mut ba = ByteArray::new(buf);
        let packet = ConnectPacket::decode(&mut ba)?;

        // A structurally sound CONNECT whose contents are rejected gets the
        // short error CONNACK before the close.
        if let Err(reason) = self.configure_client(&packet) {
            return self.reject_connect(reason).await;
        }

        if self.client.client_id().is_empty() {
            if self.config.allow_empty_client_id() {
                self.client
                    .assign_client_id(codec::utils::random_client_id());
            } else {
                return self
                    .reject_connect(ReasonCode::ClientIdentifierNotValid)
                    .await;
            }
        }

        let mut server_keep_alive = None;
        let maximum_keep_alive = self.config.maximum_keep_alive();
        if maximum_keep_alive > 0 && self.client.keep_alive() > maximum_keep_alive {
            self.client.set_keep_alive(maximum_keep_alive);
            server_keep_alive = Some(maximum_keep_alive);
        }

        let ack = self.build_connect_ack(server_keep_alive)?;
        self.send(&ack).await?;
        self.status = Status::Connected;
        log::info!(
            "session {}: client \"{}\" connected, keep alive {}s",
            self.id,
            self.client.client_id(),
            self.client.keep_alive()
        );
        Ok(())
    }

    async fn reject_connect(&mut self, reason: ReasonCode) -> Result<(), Error> {
        let _ret = self
            .stream
            .write_all(&ConnectAckPacket::short_error(reason))
            .await;
        Err(Error::from_string(
            ErrorKind::StatusError,
            format!("rejected CONNECT: {reason:?}"),
        ))
    }

    async fn on_client_publish(&mut self, buf: &[u8]) -> Result<(), Error> {
        if self.status != Status::Connected {
            return Err(Error::new(
                ErrorKind::StatusError,
                "PUBLISH before CONNECT completed",
            ));
        }

        let mut ba = ByteArray::new(buf);
        let packet = PublishPacket::decode(&mut ba)?;

        if packet.qos() > self.config.maximum_qos() {
            return Err(Error::from_string(
                ErrorKind::StatusError,
                format!("QoS {:?} not granted", packet.qos()),
            ));
        }

        let msg_len = packet.message().len();
        let limit = self.config.message_size_limit() as usize;
        if msg_len == 0 || (limit > 0 && msg_len > limit) {
            return Err(Error::from_string(
                ErrorKind::DecodeError,
                format!("message length {msg_len} outside accepted range"),
            ));
        }

        log::debug!(
            "session {}: publish to \"{}\", {} bytes",
            self.id,
            packet.topic(),
            msg_len
        );
        self.dispatcher_sender
            .send(SessionToDispatcherCmd::Publish(self.id, packet))
            .await?;
        Ok(())
    }

    fn on_client_disconnect(&mut self, buf: &[u8]) -> Result<(), Error> {
        let mut ba = ByteArray::new(buf);
        let packet = DisconnectPacket::decode(&mut ba)?;
        if packet.reason_code() == ReasonCode::DisconnectWithWillMessage {
            log::info!("session {}: will requested on disconnect", self.id);
        }
        log::info!(
            "session {}: disconnect, reason {:?}",
            self.id,
            packet.reason_code()
        );
        self.status = Status::Disconnecting;
        Ok(())
    }

    async fn send<P: EncodePacket + Packet>(&mut self, packet: &P) -> Result<(), Error> {
        let mut buf = Vec::new();
        packet.encode(&mut buf)?;
        self.stream.write_all(&buf).await.map_err(|err| {
            Error::from_string(
                ErrorKind::SendError,
                format!("failed to send {:?}: {err}", packet.packet_type()),
            )
        })
    }

    /// After each complete packet the window restarts at 1.5 times the
    /// negotiated keep-alive. Only reached once connected; the
    /// first-packet window armed at accept covers everything earlier.
    fn rearm_timer(&mut self) {
        let keep_alive = self.client.keep_alive();
        if keep_alive == 0 {
            self.timer.stop();
        } else {
            self.timer
                .reset(Duration::from_millis(u64::from(keep_alive) * 1500));
        }
    }

    /// Half-close both directions and enqueue the handle for deletion.
    /// Socket destruction itself happens when the registry drops the last
    /// reference during the main-thread drain.
    async fn close(&mut self) {
        self.status = Status::Disconnected;
        self.timer.exit();
        if let Err(err) = self.stream.shutdown().await {
            log::debug!("session {}: socket shutdown failed: {err}", self.id);
        }
        if self.shared.mark_enqueued() {
            self.deletion_queue.push_back(self.shared.clone());
        }
        log::info!("session {}: closed", self.id);
    }
}
