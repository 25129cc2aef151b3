// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use serde::Deserialize;

use crate::error::Error;

mod general;
mod listener;
mod log;

pub use self::log::{Log, LogLevel};
pub use general::General;
pub use listener::Listener;

/// Broker main config, read from a TOML file.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    general: General,

    #[serde(default)]
    listener: Listener,

    #[serde(default)]
    log: Log,
}

impl Config {
    #[must_use]
    pub const fn general(&self) -> &General {
        &self.general
    }

    #[must_use]
    pub const fn listener(&self) -> &Listener {
        &self.listener
    }

    #[must_use]
    pub const fn log(&self) -> &Log {
        &self.log
    }

    /// Validate option values.
    ///
    /// # Errors
    ///
    /// Returns error if some option in the config is invalid.
    pub fn validate(&self) -> Result<(), Error> {
        self.general.validate()?;
        self.listener.validate()
    }
}
