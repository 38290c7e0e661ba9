//! # Telemetry Frames
//!
//! The running state a droid broadcasts every control cycle.
//!
//! ## Layout (32 bytes, little-endian)
//!
//! ```text
//! ┌────────┬──────────────────┬──────────────────────┬──────────────────────┐
//! │ 0      │ 1..=3            │ 4..=15               │ 16..=31              │
//! │ seq u8 │ imus,motors,servos│ dome r,p,h body r,p,h│ servo 0..3           │
//! │        │ bool as u8       │ i16 × 6              │ f32 × 4              │
//! └────────┴──────────────────┴──────────────────────┴──────────────────────┘
//! ```

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// Exact size of a telemetry datagram.
pub const TELEMETRY_FRAME_SIZE: usize = 32;

/// Byte offsets of every telemetry field.
pub mod offsets {
    /// Sequence counter.
    pub const SEQUENCE: usize = 0;
    /// IMU health flag.
    pub const IMUS_OK: usize = 1;
    /// Motor health flag.
    pub const MOTORS_OK: usize = 2;
    /// Servo health flag.
    pub const SERVOS_OK: usize = 3;
    /// Dome roll, pitch, heading.
    pub const DOME: usize = 4;
    /// Body roll, pitch, heading.
    pub const BODY: usize = 10;
    /// Four servo channels.
    pub const SERVOS: usize = 16;
}

/// Roll, pitch and heading in raw sensor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Orientation {
    /// Roll.
    pub roll: i16,
    /// Pitch.
    pub pitch: i16,
    /// Heading.
    pub heading: i16,
}

impl Orientation {
    /// All axes zero. Reported when no telemetry is available.
    pub const ZERO: Self = Self::new(0, 0, 0);

    /// Creates an orientation.
    #[inline]
    #[must_use]
    pub const fn new(roll: i16, pitch: i16, heading: i16) -> Self {
        Self { roll, pitch, heading }
    }

    /// Returns `(roll, pitch, heading)`.
    #[inline]
    #[must_use]
    pub const fn as_tuple(&self) -> (i16, i16, i16) {
        (self.roll, self.pitch, self.heading)
    }

    fn from_wire(raw: [i16; 3]) -> Self {
        let [roll, pitch, heading] = raw.map(i16::from_le);
        Self::new(roll, pitch, heading)
    }

    fn to_wire(self) -> [i16; 3] {
        [self.roll, self.pitch, self.heading].map(i16::to_le)
    }
}

/// One decoded snapshot of a droid's reported state.
///
/// Replaced wholesale on every received datagram; no history is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Wrapping 8-bit frame counter.
    pub sequence: u8,
    /// Both IMUs answered this cycle.
    pub imus_ok: bool,
    /// Motor controllers answered this cycle.
    pub motors_ok: bool,
    /// Servo bus answered this cycle.
    pub servos_ok: bool,
    /// Dome orientation.
    pub dome: Orientation,
    /// Body orientation.
    pub body: Orientation,
    /// Servo channels (yaw, roll, pitch trim, drive speed on BB-8).
    pub servos: [f32; 4],
}

/// Raw on-wire image of a telemetry frame.
///
/// Multi-byte fields hold little-endian values; floats travel as bits.
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct TelemetryWire {
    sequence: u8,
    imus_ok: u8,
    motors_ok: u8,
    servos_ok: u8,
    dome: [i16; 3],
    body: [i16; 3],
    servos: [u32; 4],
}

const _: () = assert!(std::mem::size_of::<TelemetryWire>() == TELEMETRY_FRAME_SIZE);

impl TelemetryFrame {
    /// Decodes a telemetry datagram.
    ///
    /// Health flags follow C `bool` packing: any nonzero byte reads as true.
    ///
    /// # Errors
    ///
    /// [`DecodeError::LengthMismatch`] unless `bytes` is exactly
    /// [`TELEMETRY_FRAME_SIZE`] long.
    pub fn decode(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.len() != TELEMETRY_FRAME_SIZE {
            return Err(DecodeError::LengthMismatch {
                expected: TELEMETRY_FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let wire: TelemetryWire =
            bytemuck::try_pod_read_unaligned(bytes).map_err(|_| DecodeError::FormatError {
                offset: offsets::SEQUENCE,
                reason: "telemetry layout size",
            })?;

        Ok(Self {
            sequence: wire.sequence,
            imus_ok: wire.imus_ok != 0,
            motors_ok: wire.motors_ok != 0,
            servos_ok: wire.servos_ok != 0,
            dome: Orientation::from_wire(wire.dome),
            body: Orientation::from_wire(wire.body),
            servos: wire.servos.map(|bits| f32::from_bits(u32::from_le(bits))),
        })
    }

    /// Encodes this frame the way the droid firmware sends it.
    #[must_use]
    pub fn encode(&self) -> [u8; TELEMETRY_FRAME_SIZE] {
        let wire = TelemetryWire {
            sequence: self.sequence,
            imus_ok: u8::from(self.imus_ok),
            motors_ok: u8::from(self.motors_ok),
            servos_ok: u8::from(self.servos_ok),
            dome: self.dome.to_wire(),
            body: self.body.to_wire(),
            servos: self.servos.map(|value| value.to_bits().to_le()),
        };
        bytemuck::cast(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetryFrame {
        TelemetryFrame {
            sequence: 200,
            imus_ok: true,
            motors_ok: false,
            servos_ok: true,
            dome: Orientation::new(-12, 340, 1800),
            body: Orientation::new(i16::MIN, 0, i16::MAX),
            servos: [180.0, 175.5, -3.25, 0.0],
        }
    }

    #[test]
    fn test_wire_size() {
        assert_eq!(std::mem::size_of::<TelemetryWire>(), TELEMETRY_FRAME_SIZE);
    }

    #[test]
    fn test_field_offsets() {
        let bytes = sample().encode();

        assert_eq!(bytes[offsets::SEQUENCE], 200);
        assert_eq!(bytes[offsets::IMUS_OK], 1);
        assert_eq!(bytes[offsets::MOTORS_OK], 0);
        assert_eq!(bytes[offsets::SERVOS_OK], 1);
        assert_eq!(&bytes[offsets::DOME..offsets::DOME + 2], &(-12i16).to_le_bytes());
        assert_eq!(&bytes[offsets::DOME + 4..offsets::DOME + 6], &1800i16.to_le_bytes());
        assert_eq!(&bytes[offsets::BODY..offsets::BODY + 2], &i16::MIN.to_le_bytes());
        assert_eq!(&bytes[offsets::SERVOS..offsets::SERVOS + 4], &180.0f32.to_le_bytes());
        assert_eq!(&bytes[28..32], &0.0f32.to_le_bytes());
    }

    #[test]
    fn test_decode_encoded_frame() {
        let frame = sample();
        let decoded = TelemetryFrame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_decode_rejects_short_datagram() {
        let bytes = sample().encode();
        let err = TelemetryFrame::decode(&bytes[..31]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::LengthMismatch { expected: 32, actual: 31 }
        );
    }

    #[test]
    fn test_decode_rejects_long_datagram() {
        let mut bytes = sample().encode().to_vec();
        bytes.push(0);
        assert!(matches!(
            TelemetryFrame::decode(&bytes),
            Err(DecodeError::LengthMismatch { actual: 33, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_empty_datagram() {
        assert!(matches!(
            TelemetryFrame::decode(&[]),
            Err(DecodeError::LengthMismatch { actual: 0, .. })
        ));
    }

    #[test]
    fn test_decode_any_nonzero_flag_is_true() {
        let mut bytes = sample().encode();
        bytes[offsets::IMUS_OK] = 0;
        bytes[offsets::MOTORS_OK] = 2;
        bytes[offsets::SERVOS_OK] = 0xFF;

        let frame = TelemetryFrame::decode(&bytes).unwrap();
        assert!(!frame.imus_ok);
        assert!(frame.motors_ok);
        assert!(frame.servos_ok);
        assert_eq!(frame.sequence, sample().sequence);
    }

    #[test]
    fn test_orientation_tuple() {
        assert_eq!(Orientation::ZERO.as_tuple(), (0, 0, 0));
        assert_eq!(Orientation::new(1, -2, 3).as_tuple(), (1, -2, 3));
    }
}
