//! # Command Queue
//!
//! Coalescing outbound queue: only the latest frame per logical key is
//! ever sent.
//!
//! ## Design
//!
//! - Ordered list of `(key, frame)`, at most one entry per key
//! - Re-enqueuing a key replaces its frame and moves it to the back
//! - A wrapping 8-bit counter is bumped on every enqueue and stamped into
//!   the frame; it is unrelated to the droid's telemetry counter
//! - Flush takes the whole list before sending, so a frame is sent at most
//!   once and never re-queued

use std::net::SocketAddr;

use droidlink_shared::{
    encode_fixed_command, encode_float_command, encode_set_all_servos, encode_set_servo, Command,
    CommandFrame, CommandId, FixedCommandId, FloatCommandId,
};

use crate::error::{LinkError, LinkResult};
use crate::transport::DatagramTransport;

/// Coalescing key for a pending command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKey {
    /// One slot per command id.
    Command(CommandId),
    /// One slot per `(command id, channel)`, e.g. per servo.
    Indexed(CommandId, u8),
}

impl CommandKey {
    /// The slot `command` occupies.
    #[must_use]
    pub const fn for_command(command: &Command) -> Self {
        match *command {
            Command::SetServo { index, .. } => Self::Indexed(CommandId::SetServo, index),
            _ => Self::Command(command.id()),
        }
    }
}

/// A frame that could not be sent.
#[derive(Debug)]
pub struct SendFailure {
    /// Key the frame was queued under.
    pub key: CommandKey,
    /// Sequence number stamped into the frame.
    pub sequence: u8,
    /// What went wrong.
    pub error: LinkError,
}

/// Outcome of one flush.
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Frames handed to the transport.
    pub sent: usize,
    /// Frames lost to send errors.
    pub failures: Vec<SendFailure>,
}

/// Pending outbound commands.
#[derive(Debug, Default)]
pub struct CommandQueue {
    /// Pending frames in send order.
    pending: Vec<(CommandKey, CommandFrame)>,
    /// Last sequence number handed out.
    sequence: u8,
}

impl CommandQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            sequence: 0,
        }
    }

    /// Bumps the sequence counter, builds a frame with it and stores the
    /// frame under `key`, replacing and re-ordering any older one.
    ///
    /// Returns the sequence number used.
    pub fn enqueue(&mut self, key: CommandKey, build: impl FnOnce(u8) -> CommandFrame) -> u8 {
        self.sequence = self.sequence.wrapping_add(1);
        let frame = build(self.sequence);

        self.pending.retain(|(pending, _)| *pending != key);
        self.pending.push((key, frame));
        self.sequence
    }

    /// Queues `command` under its natural key.
    pub fn enqueue_command(&mut self, command: Command) -> u8 {
        self.enqueue(CommandKey::for_command(&command), |seq| command.encode(seq))
    }

    /// Queues "set servo `index` to `value`".
    pub fn set_servo(&mut self, index: u8, value: f32) -> u8 {
        self.enqueue(CommandKey::Indexed(CommandId::SetServo, index), |seq| {
            encode_set_servo(seq, index, value)
        })
    }

    /// Queues "set all servos".
    pub fn set_all_servos(&mut self, values: [f32; 4]) -> u8 {
        self.enqueue(CommandKey::Command(CommandId::SetAllServos), |seq| {
            encode_set_all_servos(seq, values)
        })
    }

    /// Queues a single-float command.
    pub fn float_command(&mut self, command: FloatCommandId, value: f32) -> u8 {
        self.enqueue(CommandKey::Command(command.id()), |seq| {
            encode_float_command(seq, command, value)
        })
    }

    /// Queues an argument-less command.
    pub fn fixed_command(&mut self, command: FixedCommandId) -> u8 {
        self.enqueue(CommandKey::Command(command.id()), |seq| {
            encode_fixed_command(seq, command)
        })
    }

    /// Sends every pending frame, in order, to `target` and empties the
    /// queue.
    ///
    /// Frames that fail to send are reported and dropped.
    ///
    /// # Errors
    ///
    /// [`LinkError::NoTarget`] if `target` is `None`; the queue is left
    /// intact so commands accumulate until a target exists.
    pub fn flush<T: DatagramTransport>(
        &mut self,
        transport: &mut T,
        target: Option<SocketAddr>,
    ) -> LinkResult<FlushReport> {
        let addr = target.ok_or(LinkError::NoTarget)?;
        let batch = std::mem::take(&mut self.pending);

        let mut report = FlushReport::default();
        for (key, frame) in batch {
            match transport.send_to(frame.as_bytes(), addr) {
                Ok(_) => report.sent += 1,
                Err(source) => report.failures.push(SendFailure {
                    key,
                    sequence: frame.sequence(),
                    error: LinkError::Send { addr, source },
                }),
            }
        }
        Ok(report)
    }

    /// Drops every pending frame.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Pending keys in send order.
    pub fn keys(&self) -> impl Iterator<Item = CommandKey> + '_ {
        self.pending.iter().map(|(key, _)| *key)
    }

    /// Pending frame for `key`.
    #[must_use]
    pub fn get(&self, key: CommandKey) -> Option<&CommandFrame> {
        self.pending
            .iter()
            .find(|(pending, _)| *pending == key)
            .map(|(_, frame)| frame)
    }

    /// Number of pending frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Last sequence number handed out.
    #[must_use]
    pub const fn sequence(&self) -> u8 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droidlink_shared::decode_command;
    use std::io;

    #[derive(Default)]
    struct Recorder {
        sent: Vec<(Vec<u8>, SocketAddr)>,
        fail_every_other: bool,
        calls: usize,
    }

    impl DatagramTransport for Recorder {
        fn try_recv(&mut self, _buf: &mut [u8]) -> io::Result<Option<(usize, SocketAddr)>> {
            Ok(None)
        }

        fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> io::Result<usize> {
            self.calls += 1;
            if self.fail_every_other && self.calls % 2 == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "unreachable"));
            }
            self.sent.push((data.to_vec(), addr));
            Ok(data.len())
        }
    }

    fn droid() -> Option<SocketAddr> {
        Some("192.168.4.1:2000".parse().unwrap())
    }

    #[test]
    fn test_same_key_coalesces_to_latest() {
        let mut queue = CommandQueue::new();
        queue.set_servo(1, 100.0);
        queue.set_servo(1, 200.0);
        assert_eq!(queue.len(), 1);

        let mut transport = Recorder::default();
        let report = queue.flush(&mut transport, droid()).unwrap();

        assert_eq!(report.sent, 1);
        assert!(report.failures.is_empty());
        assert!(queue.is_empty());

        let decoded = decode_command(&transport.sent[0].0).unwrap();
        assert_eq!(decoded.command, Command::SetServo { index: 1, value: 200.0 });
    }

    #[test]
    fn test_indexed_keys_are_distinct() {
        let mut queue = CommandQueue::new();
        for index in 0..4 {
            queue.set_servo(index, f32::from(index));
        }
        assert_eq!(queue.len(), 4);
        assert!(queue.get(CommandKey::Indexed(CommandId::SetServo, 2)).is_some());
        assert!(queue.get(CommandKey::Command(CommandId::SetServo)).is_none());
    }

    #[test]
    fn test_replacement_moves_to_back() {
        let mut queue = CommandQueue::new();
        queue.float_command(FloatCommandId::SetDriveMotorSpeed, 0.1);
        queue.float_command(FloatCommandId::SetTurnMotorSpeed, 0.2);
        queue.fixed_command(FixedCommandId::GetDroidName);
        queue.float_command(FloatCommandId::SetDriveMotorSpeed, 0.3);

        let keys: Vec<CommandKey> = queue.keys().collect();
        assert_eq!(
            keys,
            vec![
                CommandKey::Command(CommandId::SetTurnMotorSpeed),
                CommandKey::Command(CommandId::GetDroidName),
                CommandKey::Command(CommandId::SetDriveMotorSpeed),
            ]
        );
    }

    #[test]
    fn test_sequence_bumps_per_enqueue_and_wraps() {
        let mut queue = CommandQueue::new();
        assert_eq!(queue.sequence(), 0);
        assert_eq!(queue.set_servo(0, 1.0), 1);
        assert_eq!(queue.set_servo(0, 2.0), 2);

        for _ in 0..253 {
            queue.fixed_command(FixedCommandId::GetSoundList);
        }
        assert_eq!(queue.sequence(), 255);
        assert_eq!(queue.set_all_servos([0.0; 4]), 0);

        let frame = queue.get(CommandKey::Command(CommandId::SetAllServos)).unwrap();
        assert_eq!(frame.sequence(), 0);
        // Replaced frames keep the number they were built with
        let servo = queue.get(CommandKey::Indexed(CommandId::SetServo, 0)).unwrap();
        assert_eq!(servo.sequence(), 2);
    }

    #[test]
    fn test_flush_without_target_keeps_queue() {
        let mut queue = CommandQueue::new();
        queue.set_servo(0, 90.0);
        queue.enqueue_command(Command::Fixed(FixedCommandId::GetDroidName));

        let mut transport = Recorder::default();
        let err = queue.flush(&mut transport, None).unwrap_err();

        assert!(matches!(err, LinkError::NoTarget));
        assert_eq!(queue.len(), 2);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_flush_sends_in_order_to_target() {
        let mut queue = CommandQueue::new();
        queue.set_servo(3, 1.0);
        queue.float_command(FloatCommandId::SetDriveMotorSpeed, 0.5);

        let mut transport = Recorder::default();
        queue.flush(&mut transport, droid()).unwrap();

        let order: Vec<u8> = transport
            .sent
            .iter()
            .map(|(bytes, addr)| {
                assert_eq!(Some(*addr), droid());
                bytes[1]
            })
            .collect();
        assert_eq!(order, vec![CommandId::SetServo as u8, CommandId::SetDriveMotorSpeed as u8]);
    }

    #[test]
    fn test_send_failures_are_dropped_not_requeued() {
        let mut queue = CommandQueue::new();
        queue.set_servo(0, 1.0);
        queue.set_servo(1, 1.0);
        queue.set_servo(2, 1.0);

        let mut transport = Recorder {
            fail_every_other: true,
            ..Recorder::default()
        };
        let report = queue.flush(&mut transport, droid()).unwrap();

        assert_eq!(report.sent, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, CommandKey::Indexed(CommandId::SetServo, 1));
        assert_eq!(report.failures[0].sequence, 2);
        assert!(matches!(report.failures[0].error, LinkError::Send { .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_key_for_command() {
        assert_eq!(
            CommandKey::for_command(&Command::SetServo { index: 2, value: 0.0 }),
            CommandKey::Indexed(CommandId::SetServo, 2)
        );
        assert_eq!(
            CommandKey::for_command(&Command::Float {
                command: FloatCommandId::SetTurnMotorSpeed,
                value: 0.0
            }),
            CommandKey::Command(CommandId::SetTurnMotorSpeed)
        );
        assert_eq!(
            CommandKey::for_command(&Command::SetAllServos([0.0; 4])),
            CommandKey::Command(CommandId::SetAllServos)
        );
    }

    #[test]
    fn test_clear() {
        let mut queue = CommandQueue::new();
        queue.set_servo(0, 1.0);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.sequence(), 1);
    }
}
