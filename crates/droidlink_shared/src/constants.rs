//! # Link Constants
//!
//! Port numbers and size limits baked into the droid firmware.
//! Changes here require reflashing the droid.

/// The droid listens for commands on this port.
pub const COMMAND_PORT: u16 = 2000;

/// The droid sends its running state to this port.
pub const TELEMETRY_PORT: u16 = 2001;

/// The droid answers special commands (name, sound list) from this port.
pub const REPLY_PORT: u16 = 2002;

/// Receive buffer size. Anything longer is truncated by the socket and
/// then rejected by the decoder.
pub const MAX_DATAGRAM_SIZE: usize = 1024;
