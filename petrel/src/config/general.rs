// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use codec::QoS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, ErrorKind};

/// General section in config.
#[derive(Debug, Clone, Deserialize)]
pub struct General {
    /// Admission cap on concurrently connected clients.
    ///
    /// Default is 5.
    #[serde(default = "General::default_max_connections")]
    max_connections: usize,

    /// Seconds a fresh connection may stay silent before its first
    /// complete packet. 0 disables the gate.
    ///
    /// Default is 60.
    #[serde(default = "General::default_connect_timeout")]
    connect_timeout: u64,

    /// Largest accepted packet body in bytes.
    ///
    /// A client announcing a longer remaining length is disconnected
    /// before any body byte is read.
    ///
    /// Default is 1024.
    #[serde(default = "General::default_maximum_packet_size")]
    maximum_packet_size: u32,

    /// Cap on the PUBLISH application-message size in bytes.
    /// 0 means no cap beyond `maximum_packet_size`.
    ///
    /// Default is 1024.
    #[serde(default = "General::default_message_size_limit")]
    message_size_limit: u32,

    /// Clients asking for a longer keep-alive are clamped to this value
    /// and told so via the server-keep-alive property. 0 means no clamp.
    ///
    /// Default is 0.
    #[serde(default = "General::default_maximum_keep_alive")]
    maximum_keep_alive: u16,

    /// Highest QoS the broker grants, 0..=2.
    ///
    /// Default is 2.
    #[serde(default = "General::default_maximum_qos")]
    maximum_qos: QoS,

    /// Assign a fresh client id to clients that connect with an empty one.
    /// When false such clients are rejected.
    ///
    /// Default is true.
    #[serde(default = "General::default_allow_empty_client_id")]
    allow_empty_client_id: bool,

    /// Write the broker process id to this file on startup.
    ///
    /// Default is `petrel.pid`.
    #[serde(default = "General::default_pid_file")]
    pid_file: PathBuf,
}

impl General {
    #[must_use]
    pub const fn default_max_connections() -> usize {
        5
    }

    #[must_use]
    pub const fn default_connect_timeout() -> u64 {
        60
    }

    #[must_use]
    pub const fn default_maximum_packet_size() -> u32 {
        1024
    }

    #[must_use]
    pub const fn default_message_size_limit() -> u32 {
        1024
    }

    #[must_use]
    pub const fn default_maximum_keep_alive() -> u16 {
        0
    }

    #[must_use]
    pub const fn default_maximum_qos() -> QoS {
        QoS::ExactOnce
    }

    #[must_use]
    pub const fn default_allow_empty_client_id() -> bool {
        true
    }

    #[must_use]
    pub fn default_pid_file() -> PathBuf {
        PathBuf::from("petrel.pid")
    }

    #[must_use]
    pub const fn max_connections(&self) -> usize {
        self.max_connections
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> u64 {
        self.connect_timeout
    }

    #[must_use]
    pub const fn maximum_packet_size(&self) -> u32 {
        self.maximum_packet_size
    }

    #[must_use]
    pub const fn message_size_limit(&self) -> u32 {
        self.message_size_limit
    }

    #[must_use]
    pub const fn maximum_keep_alive(&self) -> u16 {
        self.maximum_keep_alive
    }

    #[must_use]
    pub const fn maximum_qos(&self) -> QoS {
        self.maximum_qos
    }

    #[must_use]
    pub const fn allow_empty_client_id(&self) -> bool {
        self.allow_empty_client_id
    }

    #[must_use]
    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// # Errors
    ///
    /// Returns error if some option value is out of range.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections == 0 {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "max_connections must be at least 1",
            ));
        }
        if self.maximum_packet_size == 0 {
            return Err(Error::new(
                ErrorKind::ConfigError,
                "maximum_packet_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            max_connections: Self::default_max_connections(),
            connect_timeout: Self::default_connect_timeout(),
            maximum_packet_size: Self::default_maximum_packet_size(),
            message_size_limit: Self::default_message_size_limit(),
            maximum_keep_alive: Self::default_maximum_keep_alive(),
            maximum_qos: Self::default_maximum_qos(),
            allow_empty_client_id: Self::default_allow_empty_client_id(),
            pid_file: Self::default_pid_file(),
        }
    }
}
