// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use tokio::sync::mpsc::Receiver;

use crate::commands::SessionToDispatcherCmd;

/// Sink for accepted application messages.
///
/// Subscription matching and retained-message storage live behind this
/// seam; until they exist every message is accounted and dropped.
#[derive(Debug)]
pub struct Dispatcher {
    session_receiver: Receiver<SessionToDispatcherCmd>,
    publish_count: u64,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(session_receiver: Receiver<SessionToDispatcherCmd>) -> Self {
        Self {
            session_receiver,
            publish_count: 0,
        }
    }

    pub async fn run_loop(mut self) {
        while let Some(cmd) = self.session_receiver.recv().await {
            self.handle_session_cmd(cmd);
        }
        log::info!("dispatcher: all senders gone, exiting");
    }

    fn handle_session_cmd(&mut self, cmd: SessionToDispatcherCmd) {
        match cmd {
            SessionToDispatcherCmd::Publish(session_id, packet) => {
                self.publish_count += 1;
                log::debug!(
                    "dispatcher: message #{} from session {} to \"{}\" dropped, no subscription tree",
                    self.publish_count,
                    session_id,
                    packet.topic()
                );
            }
        }
    }
}
