//! # DROIDLINK Networking - Ground Station Link
//!
//! Keeps a lossy UDP link to one or more droids alive, one tick at a time.
//!
//! ## Architecture
//!
//! - **Transport**: non-blocking UDP, drained once per tick
//! - **Registry**: latest telemetry per droid, discovery on first frame
//! - **Sequence**: 8-bit wrapping gap accounting for the selected droid
//! - **Queue**: coalescing command queue, latest value per key wins
//! - **Controller**: drain, caller work, flush
//!
//! ## Delivery Model
//!
//! ```text
//! GROUND STATION                       DROID
//!   |                                    |
//!   |<-- telemetry (32 B, every 40 ms) --|  :2001
//!   |                                    |
//!   |--- command (257 B, best effort) -->|  :2000
//!   |                                    |
//! ```
//!
//! Nothing is acknowledged or retried. Commands whose effect must persist
//! are re-enqueued by the caller every tick.
//!
//! ## Example
//!
//! ```rust,ignore
//! use droidlink_networking::{LinkConfig, LinkController, TickLoop};
//!
//! let config = LinkConfig::default();
//! let mut tick_loop = TickLoop::new(config.tick_rate);
//! let mut link = LinkController::open(config)?;
//!
//! loop {
//!     while tick_loop.should_tick() {
//!         let start = tick_loop.begin_tick();
//!         link.tick_with(|link| {
//!             let servos = link.telemetry().servo_channels();
//!             link.set_servo(0, servos[0] + 1.0);
//!         });
//!         tick_loop.end_tick(start);
//!     }
//!     tick_loop.wait_for_next_tick();
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod controller;
pub mod error;
pub mod queue;
pub mod registry;
pub mod sequence;
pub mod stats;
pub mod tick;
pub mod transport;

pub use config::LinkConfig;
pub use controller::{DrainReport, LinkController, LinkEvent, TickReport};
pub use error::{LinkError, LinkResult};
pub use queue::{CommandKey, CommandQueue, FlushReport, SendFailure};
pub use registry::{Observation, SourceRegistry, SourceView};
pub use sequence::{SequenceObservation, SequenceTracker};
pub use stats::{LinkStats, RateEstimator};
pub use tick::{TickLoop, TickStats};
pub use transport::{DatagramTransport, TransportStats, UdpTransport};

/// Control-loop rate of the droid firmware (updates per second).
///
/// At 25Hz, each tick is 40ms.
pub const DEFAULT_TICK_RATE: u32 = 25;
