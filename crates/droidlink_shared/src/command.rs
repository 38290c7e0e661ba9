//! # Command Frames
//!
//! Operator commands sent from the ground station to a droid.
//!
//! ## Layouts
//!
//! ```text
//! IndexedFloat: seq u8 │ cmd u8 │ index u8 │ value f32         │ zero padding
//! FloatList:    seq u8 │ cmd u8 │ v0 f32 │ v1 f32 │ v2 f32 │ v3 f32 │ zero padding
//! Float:        seq u8 │ cmd u8 │ value f32                    │ zero padding
//! Fixed:        seq u8 │ cmd u8                                │ zero padding
//! ```
//!
//! Every layout is padded to [`COMMAND_FRAME_SIZE`] so all command datagrams
//! share one size class on the wire.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::serialization::{FrameReader, FrameWriter};

/// Total size of every command datagram.
pub const COMMAND_FRAME_SIZE: usize = 257;

/// Command byte. Values are fixed by the droid firmware.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommandId {
    /// Set one servo channel.
    SetServo = 0,
    /// Set drive motor speed.
    SetDriveMotorSpeed = 1,
    /// Set turn motor speed.
    SetTurnMotorSpeed = 2,
    /// Set all four servo channels at once.
    SetAllServos = 3,
    /// Ask the droid for its name.
    GetDroidName = 32,
    /// Rename the droid.
    SetDroidName = 33,
    /// Ask the droid for its sound list.
    GetSoundList = 34,
}

/// Argument layout carried after the `seq, cmd` prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandLayout {
    /// `index u8, value f32`.
    IndexedFloat,
    /// `v0..v3 f32`.
    FloatList,
    /// `value f32`.
    Float,
    /// No arguments.
    Fixed,
}

impl CommandId {
    /// Maps a raw command byte back to its id.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SetServo),
            1 => Some(Self::SetDriveMotorSpeed),
            2 => Some(Self::SetTurnMotorSpeed),
            3 => Some(Self::SetAllServos),
            32 => Some(Self::GetDroidName),
            33 => Some(Self::SetDroidName),
            34 => Some(Self::GetSoundList),
            _ => None,
        }
    }

    /// Layout the droid expects for this command.
    #[must_use]
    pub const fn layout(self) -> CommandLayout {
        match self {
            Self::SetServo => CommandLayout::IndexedFloat,
            Self::SetAllServos => CommandLayout::FloatList,
            Self::SetDriveMotorSpeed | Self::SetTurnMotorSpeed => CommandLayout::Float,
            Self::GetDroidName | Self::SetDroidName | Self::GetSoundList => CommandLayout::Fixed,
        }
    }
}

/// Commands that carry a single float argument.
///
/// Only ids with [`CommandLayout::Float`] exist here, so a float frame can
/// never be stamped with an id the droid decodes differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatCommandId {
    /// Set drive motor speed.
    SetDriveMotorSpeed,
    /// Set turn motor speed.
    SetTurnMotorSpeed,
}

impl FloatCommandId {
    /// Every float command.
    pub const ALL: [Self; 2] = [Self::SetDriveMotorSpeed, Self::SetTurnMotorSpeed];

    /// Command id on the wire.
    #[inline]
    #[must_use]
    pub const fn id(self) -> CommandId {
        match self {
            Self::SetDriveMotorSpeed => CommandId::SetDriveMotorSpeed,
            Self::SetTurnMotorSpeed => CommandId::SetTurnMotorSpeed,
        }
    }

    /// Narrows `id`, if its layout is a single float.
    #[must_use]
    pub const fn from_id(id: CommandId) -> Option<Self> {
        match id {
            CommandId::SetDriveMotorSpeed => Some(Self::SetDriveMotorSpeed),
            CommandId::SetTurnMotorSpeed => Some(Self::SetTurnMotorSpeed),
            _ => None,
        }
    }
}

/// Commands without arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixedCommandId {
    /// Ask the droid for its name.
    GetDroidName,
    /// Rename the droid.
    SetDroidName,
    /// Ask the droid for its sound list.
    GetSoundList,
}

impl FixedCommandId {
    /// Every argument-less command.
    pub const ALL: [Self; 3] = [Self::GetDroidName, Self::SetDroidName, Self::GetSoundList];

    /// Command id on the wire.
    #[inline]
    #[must_use]
    pub const fn id(self) -> CommandId {
        match self {
            Self::GetDroidName => CommandId::GetDroidName,
            Self::SetDroidName => CommandId::SetDroidName,
            Self::GetSoundList => CommandId::GetSoundList,
        }
    }

    /// Narrows `id`, if it takes no arguments.
    #[must_use]
    pub const fn from_id(id: CommandId) -> Option<Self> {
        match id {
            CommandId::GetDroidName => Some(Self::GetDroidName),
            CommandId::SetDroidName => Some(Self::SetDroidName),
            CommandId::GetSoundList => Some(Self::GetSoundList),
            _ => None,
        }
    }
}

/// Status byte the droid puts in replies to special commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReplyCode {
    /// Command failed.
    Error = 62,
    /// Command succeeded.
    Ok = 63,
}

impl ReplyCode {
    /// Maps a raw reply byte back to its code.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            62 => Some(Self::Error),
            63 => Some(Self::Ok),
            _ => None,
        }
    }
}

/// An encoded, padded command datagram.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; COMMAND_FRAME_SIZE],
}

impl CommandFrame {
    /// Wire bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; COMMAND_FRAME_SIZE] {
        &self.bytes
    }

    /// Sequence number stamped into the frame.
    #[inline]
    #[must_use]
    pub const fn sequence(&self) -> u8 {
        self.bytes[0]
    }

    /// Raw command byte.
    #[inline]
    #[must_use]
    pub const fn command_byte(&self) -> u8 {
        self.bytes[1]
    }

    fn build(seq: u8, cmd: CommandId, args: impl FnOnce(&mut FrameWriter<COMMAND_FRAME_SIZE>) -> bool) -> Self {
        let mut writer = FrameWriter::new();
        let written = writer.write_u8(seq) && writer.write_u8(cmd as u8) && args(&mut writer);
        debug_assert!(written, "command arguments exceed frame size");
        Self {
            bytes: writer.into_inner(),
        }
    }
}

impl std::fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandFrame")
            .field("sequence", &self.sequence())
            .field("command", &self.command_byte())
            .finish_non_exhaustive()
    }
}

/// Encodes "set servo `index` to `value`".
#[must_use]
pub fn encode_set_servo(seq: u8, index: u8, value: f32) -> CommandFrame {
    CommandFrame::build(seq, CommandId::SetServo, |w| w.write_u8(index) && w.write_f32(value))
}

/// Encodes "set all four servos".
#[must_use]
pub fn encode_set_all_servos(seq: u8, values: [f32; 4]) -> CommandFrame {
    CommandFrame::build(seq, CommandId::SetAllServos, |w| {
        values.iter().all(|&v| w.write_f32(v))
    })
}

/// Encodes a command carrying one float argument.
#[must_use]
pub fn encode_float_command(seq: u8, cmd: FloatCommandId, value: f32) -> CommandFrame {
    CommandFrame::build(seq, cmd.id(), |w| w.write_f32(value))
}

/// Encodes a command without arguments.
#[must_use]
pub fn encode_fixed_command(seq: u8, cmd: FixedCommandId) -> CommandFrame {
    CommandFrame::build(seq, cmd.id(), |_| true)
}

/// A command with its arguments, independent of sequence numbering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Set one servo channel.
    SetServo {
        /// Servo channel.
        index: u8,
        /// Target position.
        value: f32,
    },
    /// Set all four servo channels.
    SetAllServos([f32; 4]),
    /// A single-float command such as a motor speed.
    Float {
        /// Command id.
        command: FloatCommandId,
        /// Argument.
        value: f32,
    },
    /// An argument-less command such as a name query.
    Fixed(FixedCommandId),
}

impl Command {
    /// Command id on the wire.
    #[must_use]
    pub const fn id(&self) -> CommandId {
        match self {
            Self::SetServo { .. } => CommandId::SetServo,
            Self::SetAllServos(_) => CommandId::SetAllServos,
            Self::Float { command, .. } => command.id(),
            Self::Fixed(command) => command.id(),
        }
    }

    /// Encodes this command with the given sequence number.
    #[must_use]
    pub fn encode(&self, seq: u8) -> CommandFrame {
        match *self {
            Self::SetServo { index, value } => encode_set_servo(seq, index, value),
            Self::SetAllServos(values) => encode_set_all_servos(seq, values),
            Self::Float { command, value } => encode_float_command(seq, command, value),
            Self::Fixed(command) => encode_fixed_command(seq, command),
        }
    }
}

/// A command datagram as the droid sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedCommand {
    /// Sequence number from the ground station.
    pub sequence: u8,
    /// The command.
    pub command: Command,
}

/// Decodes a command datagram using the layout of its command byte.
///
/// Padding content is not checked.
///
/// # Errors
///
/// - [`DecodeError::LengthMismatch`] unless `bytes` is exactly
///   [`COMMAND_FRAME_SIZE`] long.
/// - [`DecodeError::UnknownCommand`] for a command byte outside the id space.
pub fn decode_command(bytes: &[u8]) -> DecodeResult<DecodedCommand> {
    if bytes.len() != COMMAND_FRAME_SIZE {
        return Err(DecodeError::LengthMismatch {
            expected: COMMAND_FRAME_SIZE,
            actual: bytes.len(),
        });
    }

    let mut reader = FrameReader::new(bytes);
    let truncated = |reader: &FrameReader<'_>| DecodeError::FormatError {
        offset: reader.position(),
        reason: "command arguments truncated",
    };

    let sequence = reader.read_u8().ok_or_else(|| truncated(&reader))?;
    let raw = reader.read_u8().ok_or_else(|| truncated(&reader))?;
    let id = CommandId::from_u8(raw).ok_or(DecodeError::UnknownCommand(raw))?;

    let command = match id.layout() {
        CommandLayout::IndexedFloat => {
            let index = reader.read_u8().ok_or_else(|| truncated(&reader))?;
            let value = reader.read_f32().ok_or_else(|| truncated(&reader))?;
            Command::SetServo { index, value }
        }
        CommandLayout::FloatList => {
            let mut values = [0.0f32; 4];
            for slot in &mut values {
                *slot = reader.read_f32().ok_or_else(|| truncated(&reader))?;
            }
            Command::SetAllServos(values)
        }
        CommandLayout::Float => {
            let command = FloatCommandId::from_id(id).ok_or(DecodeError::UnknownCommand(raw))?;
            let value = reader.read_f32().ok_or_else(|| truncated(&reader))?;
            Command::Float { command, value }
        }
        CommandLayout::Fixed => {
            Command::Fixed(FixedCommandId::from_id(id).ok_or(DecodeError::UnknownCommand(raw))?)
        }
    };

    Ok(DecodedCommand { sequence, command })
}
