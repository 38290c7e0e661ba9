//! # Link Events
//!
//! Notifications the controller publishes for a UI or logger thread.
//!
//! ```text
//! drain ──► SourceDiscovered ──► SourceSelected (first droid only)
//!       ├─► DatagramRejected
//!       └─► FramesDropped      (selected droid only)
//! flush ──► SendFailed
//! ```
//!
//! The channel is bounded; when it is full new events are dropped so the
//! tick never blocks on a slow consumer.

use std::net::{IpAddr, SocketAddr};

use droidlink_shared::DecodeError;

/// Something noteworthy happened on the link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// A droid sent its first valid frame.
    SourceDiscovered(IpAddr),

    /// The selected droid changed.
    SourceSelected(IpAddr),

    /// A datagram failed to decode and was dropped.
    DatagramRejected {
        /// Sender of the datagram.
        from: SocketAddr,
        /// Why it was rejected.
        error: DecodeError,
    },

    /// Frames from the selected droid went missing.
    FramesDropped {
        /// The selected droid.
        source: IpAddr,
        /// Frames missing before the one just received.
        gap: u8,
    },

    /// A command frame could not be sent and was discarded.
    SendFailed {
        /// Destination of the frame.
        target: SocketAddr,
        /// Sequence number stamped into the frame.
        sequence: u8,
    },
}
