//! # DROIDLINK Shared
//!
//! Wire protocol spoken between the ground station and a droid.
//!
//! ## Datagrams
//!
//! ```text
//! droid ──── telemetry (32 bytes) ────► ground station   (port 2001)
//! droid ◄─── command (257 bytes) ────── ground station   (port 2000)
//! ```
//!
//! All numeric fields are little-endian. Layouts are defined once in
//! [`telemetry`] and [`command`] and shared by encoder and decoder.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER open a socket. Transport lives in
//! `droidlink_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod command;
pub mod constants;
pub mod error;
pub mod serialization;
pub mod telemetry;

pub use command::{
    decode_command, encode_fixed_command, encode_float_command, encode_set_all_servos,
    encode_set_servo, Command, CommandFrame, CommandId, CommandLayout, DecodedCommand,
    FixedCommandId, FloatCommandId, ReplyCode, COMMAND_FRAME_SIZE,
};
pub use constants::{COMMAND_PORT, MAX_DATAGRAM_SIZE, REPLY_PORT, TELEMETRY_PORT};
pub use error::{DecodeError, DecodeResult};
pub use serialization::{FrameReader, FrameWriter};
pub use telemetry::{Orientation, TelemetryFrame, TELEMETRY_FRAME_SIZE};
