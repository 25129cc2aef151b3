// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::Sender;

use crate::commands::SessionToDispatcherCmd;
use crate::config::Config;
use crate::error::Error;
use crate::queue::TsQueue;
use crate::session::{Session, SessionConfig, SessionRef};
use crate::stream::Stream;
use crate::timer::TimerService;
use crate::types::SessionId;

/// Accepts TCP connections and turns them into sessions.
///
/// Admission is decided here: above the connection cap a fresh handle goes
/// straight to the deletion queue and the socket is dropped without a
/// single read. Accepted connections are registered before their read loop
/// starts.
#[derive(Debug)]
pub struct Listener {
    listener: TcpListener,
    session_config: SessionConfig,
    max_connections: usize,
    current_session_id: SessionId,

    active_sessions: Arc<TsQueue<SessionRef>>,
    deletion_queue: Arc<TsQueue<SessionRef>>,
    dispatcher_sender: Sender<SessionToDispatcherCmd>,
    timer_service: TimerService,
}

impl Listener {
    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be bound.
    pub async fn bind(
        config: &Config,
        active_sessions: Arc<TsQueue<SessionRef>>,
        deletion_queue: Arc<TsQueue<SessionRef>>,
        dispatcher_sender: Sender<SessionToDispatcherCmd>,
        timer_service: TimerService,
    ) -> Result<Self, Error> {
        let address = config.listener().address();
        let listener = TcpListener::bind(address).await?;
        log::info!("listening on mqtt://{address}");
        Ok(Self {
            listener,
            session_config: SessionConfig::new(config.general()),
            max_connections: config.general().max_connections(),
            current_session_id: 0,
            active_sessions,
            deletion_queue,
            dispatcher_sender,
            timer_service,
        })
    }

    /// The address actually bound; differs from the configured one when
    /// port 0 was requested.
    ///
    /// # Errors
    ///
    /// Returns error if the socket is gone.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run_loop(mut self) {
        loop {
            match self.listener.accept().await {
                Ok((socket, address)) => self.new_connection(socket, address),
                Err(err) => log::error!("accept failed: {err}"),
            }
        }
    }

    fn next_session_id(&mut self) -> SessionId {
        self.current_session_id += 1;
        self.current_session_id
    }

    fn new_connection(&mut self, socket: TcpStream, address: SocketAddr) {
        let id = self.next_session_id();
        let shared = SessionRef::new(id);

        if self.active_sessions.len() >= self.max_connections {
            log::warn!("session {id}: {address} rejected, connection cap reached");
            // Never registered; the drain disposes of the handle and the
            // dropped socket closes the peer.
            self.deletion_queue.push_back(shared);
            return;
        }

        log::info!("session {id}: accepted {address}");
        self.active_sessions.push_back(shared.clone());
        let session = Session::new(
            shared,
            Stream::new(socket),
            self.session_config.clone(),
            &self.timer_service,
            Arc::clone(&self.deletion_queue),
            self.dispatcher_sender.clone(),
        );
        tokio::spawn(session.run_loop());
    }
}
