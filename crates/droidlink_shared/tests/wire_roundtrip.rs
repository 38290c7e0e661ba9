//! Randomized round-trip checks for the telemetry and command layouts.

use droidlink_shared::{
    decode_command, Command, DecodeError, FixedCommandId, FloatCommandId, Orientation,
    TelemetryFrame, COMMAND_FRAME_SIZE, TELEMETRY_FRAME_SIZE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_frame(rng: &mut StdRng) -> TelemetryFrame {
    let mut orientation = || Orientation::new(rng.gen(), rng.gen(), rng.gen());
    let dome = orientation();
    let body = orientation();
    TelemetryFrame {
        sequence: rng.gen(),
        imus_ok: rng.gen(),
        motors_ok: rng.gen(),
        servos_ok: rng.gen(),
        dome,
        body,
        servos: [
            rng.gen_range(-360.0..360.0),
            rng.gen_range(-360.0..360.0),
            rng.gen_range(-360.0..360.0),
            rng.gen_range(-1.0..1.0),
        ],
    }
}

#[test]
fn test_telemetry_roundtrip_random() {
    let mut rng = StdRng::seed_from_u64(0xB8);
    for _ in 0..1000 {
        let frame = random_frame(&mut rng);
        let bytes = frame.encode();
        assert_eq!(bytes.len(), TELEMETRY_FRAME_SIZE);
        assert_eq!(TelemetryFrame::decode(&bytes), Ok(frame));
    }
}

#[test]
fn test_telemetry_every_truncation_is_rejected() {
    let mut rng = StdRng::seed_from_u64(7);
    let bytes = random_frame(&mut rng).encode();
    for len in 0..TELEMETRY_FRAME_SIZE {
        assert_eq!(
            TelemetryFrame::decode(&bytes[..len]),
            Err(DecodeError::LengthMismatch {
                expected: TELEMETRY_FRAME_SIZE,
                actual: len,
            })
        );
    }
}

#[test]
fn test_telemetry_garbage_never_panics() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..1000 {
        let len = rng.gen_range(0..64);
        let bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
        let _ = TelemetryFrame::decode(&bytes);
    }
}

#[test]
fn test_command_roundtrip_random() {
    let mut rng = StdRng::seed_from_u64(0x2000);
    for _ in 0..500 {
        let command = match rng.gen_range(0..4) {
            0 => Command::SetServo {
                index: rng.gen_range(0..4),
                value: rng.gen_range(60.0..300.0),
            },
            1 => Command::SetAllServos([rng.gen(), rng.gen(), rng.gen(), rng.gen()]),
            2 => Command::Float {
                command: FloatCommandId::ALL[rng.gen_range(0..FloatCommandId::ALL.len())],
                value: rng.gen_range(-1.0..1.0),
            },
            _ => Command::Fixed(FixedCommandId::ALL[rng.gen_range(0..FixedCommandId::ALL.len())]),
        };
        let seq: u8 = rng.gen();
        let frame = command.encode(seq);
        assert_eq!(frame.as_bytes().len(), COMMAND_FRAME_SIZE);

        let decoded = decode_command(frame.as_bytes()).unwrap();
        assert_eq!(decoded.sequence, seq);
        assert_eq!(decoded.command, command);
    }
}
