//! # Link Controller
//!
//! Owns the socket, the source registry, the sequence tracker and the
//! command queue, and runs them one tick at a time.
//!
//! ## Tick procedure
//!
//! ```text
//! 1. drain   every waiting datagram: decode → registry → discovery → tracker
//! 2. work    caller code reads telemetry and enqueues commands
//! 3. flush   the queue to the selected droid (or the broadcast address)
//! ```
//!
//! ## Design
//!
//! - Single-threaded: all state is mutated synchronously inside a tick
//! - A malformed datagram is dropped and the drain continues
//! - A failed send drops that frame; nothing is retried
//! - With no target the queue is held, not discarded

mod events;

pub use events::LinkEvent;

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use droidlink_shared::{
    Command, DecodeResult, FixedCommandId, FloatCommandId, TelemetryFrame, MAX_DATAGRAM_SIZE,
};
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, LinkResult};
use crate::queue::{CommandQueue, FlushReport};
use crate::registry::{SourceRegistry, SourceView};
use crate::sequence::SequenceTracker;
use crate::stats::{LinkStats, RateEstimator};
use crate::transport::{DatagramTransport, TransportStats, UdpTransport};

/// Boxed no-argument discovery notification.
type DiscoveryCallback = Box<dyn FnMut() + Send>;

/// What one drain pulled off the socket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Datagrams received.
    pub received: usize,
    /// Datagrams decoded into telemetry frames.
    pub accepted: usize,
    /// Datagrams dropped as malformed.
    pub rejected: usize,
    /// Sources heard from for the first time.
    pub discovered: usize,
}

/// Outcome of one full tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Inbound half.
    pub drain: DrainReport,
    /// Command frames sent.
    pub sent: usize,
    /// Command frames lost to send errors.
    pub send_failures: usize,
    /// Command frames held back for lack of a target.
    pub held: usize,
}

impl DrainReport {
    /// Adds `other`'s counts to this one.
    pub fn merge(&mut self, other: &Self) {
        self.received += other.received;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.discovered += other.discovered;
    }
}

impl TickReport {
    /// Folds a later tick into this running total.
    ///
    /// Counts are summed; `held` is a queue depth, so the latest value wins.
    pub fn merge(&mut self, other: &Self) {
        self.drain.merge(&other.drain);
        self.sent += other.sent;
        self.send_failures += other.send_failures;
        self.held = other.held;
    }
}

/// Ground-station side of the droid link.
pub struct LinkController<T = UdpTransport> {
    config: LinkConfig,
    transport: T,
    registry: SourceRegistry,
    tracker: SequenceTracker,
    queue: CommandQueue,
    selected: Option<IpAddr>,
    broadcast: bool,
    on_discovery: Option<DiscoveryCallback>,
    event_tx: Sender<LinkEvent>,
    event_rx: Receiver<LinkEvent>,
    rate: RateEstimator,
    stats: LinkStats,
    recv_buffer: [u8; MAX_DATAGRAM_SIZE],
}

impl LinkController<UdpTransport> {
    /// Binds the telemetry socket and returns a ready controller.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Config`] if `config` fails validation.
    /// - [`LinkError::Bind`] if the telemetry port cannot be bound.
    /// - [`LinkError::Io`] if broadcast is configured but cannot be enabled.
    pub fn open(config: LinkConfig) -> LinkResult<Self> {
        config.validate()?;
        let addr = config.listen_addr();
        let transport = UdpTransport::bind(addr).map_err(|source| LinkError::Bind { addr, source })?;
        info!(local = %transport.local_addr(), broadcast = config.broadcast, "link open");
        Self::with_transport(config, transport)
    }

    /// Local address telemetry is received on.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Socket-level counters.
    #[must_use]
    pub const fn transport_stats(&self) -> &TransportStats {
        self.transport.stats()
    }
}

impl<T: DatagramTransport> LinkController<T> {
    /// Builds a controller around an already-open transport.
    ///
    /// # Errors
    ///
    /// As [`LinkController::open`], minus binding.
    pub fn with_transport(config: LinkConfig, mut transport: T) -> LinkResult<Self> {
        config.validate()?;
        if config.broadcast {
            transport.set_broadcast(true)?;
        }

        let (event_tx, event_rx) = crossbeam_channel::bounded(config.event_capacity);
        Ok(Self {
            broadcast: config.broadcast,
            rate: RateEstimator::new(config.rate_window),
            config,
            transport,
            registry: SourceRegistry::new(),
            tracker: SequenceTracker::new(),
            queue: CommandQueue::new(),
            selected: None,
            on_discovery: None,
            event_tx,
            event_rx,
            stats: LinkStats::default(),
            recv_buffer: [0; MAX_DATAGRAM_SIZE],
        })
    }

    /// Releases the socket. Pending commands are discarded.
    pub fn close(self) {
        info!(pending = self.queue.len(), "link closed");
    }

    /// Gives the transport back, discarding all link state.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Discovery and selection
    // ------------------------------------------------------------------------

    /// Registers the callback fired once per newly discovered droid.
    ///
    /// Replaces any earlier callback.
    pub fn set_discovery_callback(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_discovery = Some(Box::new(callback));
    }

    /// Receiving end of the event channel. Every clone shares one stream.
    #[must_use]
    pub fn events(&self) -> Receiver<LinkEvent> {
        self.event_rx.clone()
    }

    /// Droids heard from so far, in first-seen order.
    #[must_use]
    pub fn discovered(&self) -> Vec<IpAddr> {
        self.registry.known_addresses().collect()
    }

    /// The source registry.
    #[must_use]
    pub const fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Selects the droid commands go to and whose telemetry is tracked.
    ///
    /// Switching to a different droid restarts gap tracking and the rate
    /// estimate; re-selecting the current one is a no-op.
    pub fn select(&mut self, source: IpAddr) {
        if self.selected == Some(source) {
            return;
        }
        self.selected = Some(source);
        self.tracker.reset();
        self.rate.reset();
        info!(%source, "droid selected");
        self.publish(LinkEvent::SourceSelected(source));
    }

    /// Drops the selection. The next valid frame selects its sender.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.tracker.reset();
        self.rate.reset();
    }

    /// Currently selected droid.
    #[inline]
    #[must_use]
    pub const fn selected(&self) -> Option<IpAddr> {
        self.selected
    }

    /// Sends commands to the broadcast address instead of the selection.
    ///
    /// # Errors
    ///
    /// [`LinkError::Io`] if the socket refuses the broadcast option.
    pub fn use_broadcast(&mut self, enabled: bool) -> LinkResult<()> {
        self.transport.set_broadcast(enabled)?;
        self.broadcast = enabled;
        Ok(())
    }

    /// Returns true if commands go to the broadcast address.
    #[inline]
    #[must_use]
    pub const fn uses_broadcast(&self) -> bool {
        self.broadcast
    }

    /// Where the next flush would send, if anywhere.
    #[must_use]
    pub fn command_target(&self) -> Option<SocketAddr> {
        if self.broadcast {
            Some(self.config.broadcast_addr())
        } else {
            self.selected.map(|ip| self.config.command_addr(ip))
        }
    }

    // ------------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------------

    /// Telemetry of the selected droid, with fallbacks when there is none.
    #[must_use]
    pub fn telemetry(&self) -> SourceView<'_> {
        self.registry.view(self.selected)
    }

    /// Telemetry of any droid, with fallbacks when it is unknown.
    #[must_use]
    pub fn telemetry_of(&self, source: IpAddr) -> SourceView<'_> {
        self.registry.view(Some(source))
    }

    /// Returns true if the selected droid has gone quiet for longer than
    /// the configured threshold, or nothing is selected.
    #[must_use]
    pub fn selected_is_stale(&self, now: Instant) -> bool {
        self.telemetry().is_stale(now, self.config.stale_after())
    }

    /// Gap accounting for the selected droid.
    #[must_use]
    pub const fn sequence_tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Telemetry rate from the selected droid, in Hz.
    #[must_use]
    pub fn message_rate_hz(&self) -> f64 {
        self.rate.hz()
    }

    /// Link counters.
    #[must_use]
    pub const fn stats(&self) -> &LinkStats {
        &self.stats
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Commands waiting for the next flush.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// The command queue.
    #[must_use]
    pub const fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Queues any command. Returns its sequence number.
    pub fn enqueue(&mut self, command: Command) -> u8 {
        self.queue.enqueue_command(command)
    }

    /// Queues "set servo `index` to `value`".
    pub fn set_servo(&mut self, index: u8, value: f32) -> u8 {
        self.queue.set_servo(index, value)
    }

    /// Queues "set all servos".
    pub fn set_all_servos(&mut self, values: [f32; 4]) -> u8 {
        self.queue.set_all_servos(values)
    }

    /// Queues a drive motor speed.
    pub fn set_drive_motor_speed(&mut self, speed: f32) -> u8 {
        self.queue.float_command(FloatCommandId::SetDriveMotorSpeed, speed)
    }

    /// Queues a turn motor speed.
    pub fn set_turn_motor_speed(&mut self, speed: f32) -> u8 {
        self.queue.float_command(FloatCommandId::SetTurnMotorSpeed, speed)
    }

    /// Queues a single-float command.
    pub fn float_command(&mut self, command: FloatCommandId, value: f32) -> u8 {
        self.queue.float_command(command, value)
    }

    /// Queues an argument-less command.
    pub fn fixed_command(&mut self, command: FixedCommandId) -> u8 {
        self.queue.fixed_command(command)
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Runs one tick with no caller work between drain and flush.
    pub fn tick(&mut self) -> TickReport {
        self.tick_with(|_| {})
    }

    /// Runs one tick: drain, then `work`, then flush.
    ///
    /// Never fails: per-datagram problems are counted, logged and published
    /// as events.
    pub fn tick_with(&mut self, work: impl FnOnce(&mut Self)) -> TickReport {
        let drain = self.drain();
        work(self);

        let mut report = TickReport {
            drain,
            ..TickReport::default()
        };
        match self.flush() {
            Ok(flushed) => {
                report.sent = flushed.sent;
                report.send_failures = flushed.failures.len();
            }
            Err(error) => {
                report.held = self.queue.len();
                if report.held > 0 {
                    trace!(%error, held = report.held, "flush deferred");
                }
            }
        }

        trace!(
            received = drain.received,
            accepted = drain.accepted,
            sent = report.sent,
            "tick"
        );
        report
    }

    /// Receives and processes every datagram waiting on the socket.
    ///
    /// A receive error is logged and ends the drain early.
    pub fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        loop {
            let (len, from) = match self.transport.try_recv(&mut self.recv_buffer) {
                Ok(Some(received)) => received,
                Ok(None) => break,
                Err(error) => {
                    self.stats.recv_errors += 1;
                    warn!(%error, "receive failed");
                    break;
                }
            };

            report.received += 1;
            let decoded = TelemetryFrame::decode(&self.recv_buffer[..len]);
            self.handle_datagram(from, decoded, Instant::now(), &mut report);
        }
        report
    }

    /// Sends every pending command to the current target.
    ///
    /// Failed frames are dropped, logged and published as
    /// [`LinkEvent::SendFailed`].
    ///
    /// # Errors
    ///
    /// [`LinkError::NoTarget`] when nothing is selected and broadcast is
    /// off; the queue is kept.
    pub fn flush(&mut self) -> LinkResult<FlushReport> {
        let target = self.command_target();
        let report = self.queue.flush(&mut self.transport, target)?;

        self.stats.commands_sent += report.sent as u64;
        for failure in &report.failures {
            self.stats.send_failures += 1;
            warn!(error = %failure.error, sequence = failure.sequence, "command dropped");
            if let LinkError::Send { addr, .. } = failure.error {
                self.publish(LinkEvent::SendFailed {
                    target: addr,
                    sequence: failure.sequence,
                });
            }
        }
        Ok(report)
    }

    fn handle_datagram(
        &mut self,
        from: SocketAddr,
        decoded: DecodeResult<TelemetryFrame>,
        now: Instant,
        report: &mut DrainReport,
    ) {
        self.stats.datagrams_received += 1;

        let frame = match decoded {
            Ok(frame) => frame,
            Err(error) => {
                report.rejected += 1;
                self.stats.datagrams_rejected += 1;
                debug!(%from, %error, "datagram rejected");
                self.publish(LinkEvent::DatagramRejected { from, error });
                return;
            }
        };
        report.accepted += 1;
        self.stats.frames_accepted += 1;

        let source = from.ip();
        if self.registry.observe_at(source, frame, now).is_new {
            report.discovered += 1;
            self.stats.sources_discovered += 1;
            info!(%source, "droid discovered");
            self.publish(LinkEvent::SourceDiscovered(source));
            if let Some(callback) = self.on_discovery.as_mut() {
                callback();
            }
        }

        if self.selected.is_none() {
            self.select(source);
        }

        if self.selected == Some(source) {
            let observation = self.tracker.observe(frame.sequence);
            if !observation.is_good {
                self.stats.frames_dropped += u64::from(observation.gap);
                debug!(%source, gap = observation.gap, sequence = frame.sequence, "frames dropped");
                self.publish(LinkEvent::FramesDropped {
                    source,
                    gap: observation.gap,
                });
            }
            self.rate.record(now);
        }
    }

    fn publish(&self, event: LinkEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
