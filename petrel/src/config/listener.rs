// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use serde::Deserialize;
use std::net::ToSocketAddrs;

use crate::error::{Error, ErrorKind};

/// Listener section in config. Plain TCP only.
#[derive(Debug, Clone, Deserialize)]
pub struct Listener {
    /// Socket address to bind, `host:port`.
    ///
    /// Default is `0.0.0.0:1883`.
    #[serde(default = "Listener::default_address")]
    address: String,
}

impl Listener {
    #[must_use]
    pub fn default_address() -> String {
        "0.0.0.0:1883".to_string()
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// # Errors
    ///
    /// Returns error if the address does not resolve.
    pub fn validate(&self) -> Result<(), Error> {
        let mut addrs = self.address.to_socket_addrs().map_err(|err| {
            Error::from_string(
                ErrorKind::ConfigError,
                format!("Invalid listener address {}: {err}", self.address),
            )
        })?;
        if addrs.next().is_none() {
            return Err(Error::from_string(
                ErrorKind::ConfigError,
                format!("Listener address {} resolves to nothing", self.address),
            ));
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            address: Self::default_address(),
        }
    }
}
