//! # Link Configuration
//!
//! Loaded once at startup from TOML. Every field has a default matching the
//! droid firmware, so an empty file is a valid configuration.
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! telemetry_port = 2001
//! command_port = 2000
//! broadcast = false
//! tick_rate = 25
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use droidlink_shared::{COMMAND_PORT, TELEMETRY_PORT};
use serde::Deserialize;

use crate::error::{LinkError, LinkResult};

/// Ground-station link configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Local interface to receive telemetry on.
    pub bind_address: IpAddr,
    /// Local port droids send telemetry to.
    pub telemetry_port: u16,
    /// Port droids listen on for commands.
    pub command_port: u16,
    /// Send commands to `broadcast_address` instead of the selected droid.
    pub broadcast: bool,
    /// Destination used in broadcast mode.
    pub broadcast_address: Ipv4Addr,
    /// Ticks per second for the binaries' loops.
    pub tick_rate: u32,
    /// Capacity of the link event channel.
    pub event_capacity: usize,
    /// Inter-arrival samples averaged for the message rate.
    pub rate_window: usize,
    /// Age after which a source counts as stale, in milliseconds.
    pub stale_after_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            telemetry_port: TELEMETRY_PORT,
            command_port: COMMAND_PORT,
            broadcast: false,
            broadcast_address: Ipv4Addr::BROADCAST,
            tick_rate: crate::DEFAULT_TICK_RATE,
            event_capacity: 256,
            rate_window: 20,
            stale_after_ms: 1000,
        }
    }
}

impl LinkConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`LinkError::Config`] on syntax errors, unknown keys or invalid values.
    pub fn from_toml_str(text: &str) -> LinkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| LinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`LinkError::Io`] if the file cannot be read, otherwise as
    /// [`LinkConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> LinkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks values that deserialize fine but cannot run.
    ///
    /// # Errors
    ///
    /// [`LinkError::Config`] naming the first offending field.
    pub fn validate(&self) -> LinkResult<()> {
        if self.tick_rate == 0 {
            return Err(LinkError::Config("tick_rate must be at least 1".into()));
        }
        if self.event_capacity == 0 {
            return Err(LinkError::Config("event_capacity must be at least 1".into()));
        }
        if self.rate_window == 0 {
            return Err(LinkError::Config("rate_window must be at least 1".into()));
        }
        Ok(())
    }

    /// Socket address telemetry is received on.
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.telemetry_port)
    }

    /// Command address of the droid at `ip`.
    #[must_use]
    pub const fn command_addr(&self, ip: IpAddr) -> SocketAddr {
        SocketAddr::new(ip, self.command_port)
    }

    /// Command address used in broadcast mode.
    #[must_use]
    pub const fn broadcast_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(self.broadcast_address), self.command_port)
    }

    /// Staleness threshold.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}
