//! # Source Registry
//!
//! Latest telemetry per droid, keyed by the droid's IP address.
//!
//! ## Design
//!
//! - A source is created by its first datagram and never expires
//! - Its frame is replaced wholesale; no history is kept
//! - Iteration order is first-seen order
//! - Reads go through [`SourceView`], which reports fixed fallback values
//!   for unknown sources instead of failing

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use droidlink_shared::{Orientation, TelemetryFrame};

/// Bookkeeping for one droid.
#[derive(Clone, Copy, Debug)]
struct SourceEntry {
    frame: TelemetryFrame,
    first_seen: Instant,
    last_seen: Instant,
    packets: u64,
}

/// Result of recording a datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// The address was unknown before this datagram.
    pub is_new: bool,
}

/// Every droid heard from so far.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    /// Entries in first-seen order.
    entries: Vec<(IpAddr, SourceEntry)>,
    /// Address to position in `entries`.
    index: HashMap<IpAddr, usize>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `frame` as the latest from `addr`, timestamped now.
    pub fn observe(&mut self, addr: IpAddr, frame: TelemetryFrame) -> Observation {
        self.observe_at(addr, frame, Instant::now())
    }

    /// Records `frame` as the latest from `addr`, received at `now`.
    pub fn observe_at(&mut self, addr: IpAddr, frame: TelemetryFrame, now: Instant) -> Observation {
        if let Some(&slot) = self.index.get(&addr) {
            let entry = &mut self.entries[slot].1;
            entry.frame = frame;
            entry.last_seen = now;
            entry.packets += 1;
            return Observation { is_new: false };
        }

        self.index.insert(addr, self.entries.len());
        self.entries.push((
            addr,
            SourceEntry {
                frame,
                first_seen: now,
                last_seen: now,
                packets: 1,
            },
        ));
        Observation { is_new: true }
    }

    /// Known addresses in first-seen order.
    pub fn known_addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.entries.iter().map(|(addr, _)| *addr)
    }

    /// Returns true if `addr` has sent at least one valid frame.
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.index.contains_key(&addr)
    }

    /// Latest frame from `addr`.
    #[must_use]
    pub fn latest(&self, addr: IpAddr) -> Option<&TelemetryFrame> {
        self.entry(addr).map(|entry| &entry.frame)
    }

    /// Read accessor for `addr`; `None` or an unknown address yields
    /// fallback values.
    #[must_use]
    pub fn view(&self, addr: Option<IpAddr>) -> SourceView<'_> {
        SourceView {
            entry: addr.and_then(|addr| self.entry(addr)),
        }
    }

    /// Number of known sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no source has been seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, addr: IpAddr) -> Option<&SourceEntry> {
        self.index.get(&addr).map(|&slot| &self.entries[slot].1)
    }
}

/// Telemetry accessors with defined fallbacks.
///
/// | accessor            | unknown source |
/// |---------------------|----------------|
/// | `sequence`          | `-1`           |
/// | health flags        | `false`        |
/// | orientations        | all zero       |
/// | `servo_channels`    | all zero       |
#[derive(Clone, Copy, Debug)]
pub struct SourceView<'a> {
    entry: Option<&'a SourceEntry>,
}

impl<'a> SourceView<'a> {
    /// Returns true if the source has reported at least once.
    #[inline]
    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.entry.is_some()
    }

    /// Latest frame, if any.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> Option<&'a TelemetryFrame> {
        self.entry.map(|entry| &entry.frame)
    }

    /// Sequence number of the latest frame, or `-1`.
    #[must_use]
    pub fn sequence(&self) -> i16 {
        self.frame().map_or(-1, |f| i16::from(f.sequence))
    }

    /// IMU health, or `false`.
    #[must_use]
    pub fn imus_ok(&self) -> bool {
        self.frame().is_some_and(|f| f.imus_ok)
    }

    /// Motor health, or `false`.
    #[must_use]
    pub fn motors_ok(&self) -> bool {
        self.frame().is_some_and(|f| f.motors_ok)
    }

    /// Servo health, or `false`.
    #[must_use]
    pub fn servos_ok(&self) -> bool {
        self.frame().is_some_and(|f| f.servos_ok)
    }

    /// Dome orientation, or all zero.
    #[must_use]
    pub fn dome_orientation(&self) -> Orientation {
        self.frame().map_or(Orientation::ZERO, |f| f.dome)
    }

    /// Body orientation, or all zero.
    #[must_use]
    pub fn body_orientation(&self) -> Orientation {
        self.frame().map_or(Orientation::ZERO, |f| f.body)
    }

    /// Servo channels, or all zero.
    #[must_use]
    pub fn servo_channels(&self) -> [f32; 4] {
        self.frame().map_or([0.0; 4], |f| f.servos)
    }

    /// Valid frames received from this source.
    #[must_use]
    pub fn packets(&self) -> u64 {
        self.entry.map_or(0, |entry| entry.packets)
    }

    /// When the source was first heard from.
    #[must_use]
    pub fn first_seen(&self) -> Option<Instant> {
        self.entry.map(|entry| entry.first_seen)
    }

    /// Time since the last frame, as of `now`.
    #[must_use]
    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.entry.map(|entry| now.saturating_duration_since(entry.last_seen))
    }

    /// Returns true if nothing arrived within `threshold` of `now`.
    /// Unknown sources are always stale.
    #[must_use]
    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        self.age(now).map_or(true, |age| age > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([192, 168, 4, last])
    }

    fn frame(sequence: u8) -> TelemetryFrame {
        TelemetryFrame {
            sequence,
            imus_ok: true,
            motors_ok: true,
            servos_ok: false,
            dome: Orientation::new(1, 2, 3),
            body: Orientation::new(-4, -5, -6),
            servos: [180.0, 181.0, 182.0, 0.5],
        }
    }

    #[test]
    fn test_first_observation_is_new() {
        let mut registry = SourceRegistry::new();
        assert!(registry.is_empty());

        assert!(registry.observe(ip(2), frame(0)).is_new);
        assert!(!registry.observe(ip(2), frame(1)).is_new);
        assert!(!registry.observe(ip(2), frame(2)).is_new);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.view(Some(ip(2))).packets(), 3);
    }

    #[test]
    fn test_latest_replaces_frame() {
        let mut registry = SourceRegistry::new();
        registry.observe(ip(2), frame(10));
        registry.observe(ip(2), frame(11));

        assert_eq!(registry.latest(ip(2)).map(|f| f.sequence), Some(11));
        assert!(registry.latest(ip(3)).is_none());
    }

    #[test]
    fn test_known_addresses_in_first_seen_order() {
        let mut registry = SourceRegistry::new();
        registry.observe(ip(9), frame(0));
        registry.observe(ip(3), frame(0));
        registry.observe(ip(9), frame(1));
        registry.observe(ip(5), frame(0));

        let order: Vec<IpAddr> = registry.known_addresses().collect();
        assert_eq!(order, vec![ip(9), ip(3), ip(5)]);
        assert!(registry.contains(ip(3)));
        assert!(!registry.contains(ip(4)));
    }

    #[test]
    fn test_view_reports_frame() {
        let mut registry = SourceRegistry::new();
        registry.observe(ip(2), frame(42));

        let view = registry.view(Some(ip(2)));
        assert!(view.is_known());
        assert_eq!(view.sequence(), 42);
        assert!(view.imus_ok());
        assert!(view.motors_ok());
        assert!(!view.servos_ok());
        assert_eq!(view.dome_orientation().as_tuple(), (1, 2, 3));
        assert_eq!(view.body_orientation().as_tuple(), (-4, -5, -6));
        assert_eq!(view.servo_channels(), [180.0, 181.0, 182.0, 0.5]);
    }

    #[test]
    fn test_view_fallbacks() {
        let mut registry = SourceRegistry::new();
        registry.observe(ip(2), frame(42));

        for view in [registry.view(Some(ip(77))), registry.view(None)] {
            assert!(!view.is_known());
            assert!(view.frame().is_none());
            assert_eq!(view.sequence(), -1);
            assert!(!view.imus_ok());
            assert!(!view.motors_ok());
            assert!(!view.servos_ok());
            assert_eq!(view.dome_orientation(), Orientation::ZERO);
            assert_eq!(view.body_orientation(), Orientation::ZERO);
            assert_eq!(view.servo_channels(), [0.0; 4]);
            assert_eq!(view.packets(), 0);
        }
    }

    #[test]
    fn test_staleness() {
        let mut registry = SourceRegistry::new();
        let t0 = Instant::now();
        registry.observe_at(ip(2), frame(0), t0);

        let view = registry.view(Some(ip(2)));
        let threshold = Duration::from_millis(500);
        assert_eq!(view.first_seen(), Some(t0));
        assert_eq!(view.age(t0 + Duration::from_millis(200)), Some(Duration::from_millis(200)));
        assert!(!view.is_stale(t0 + Duration::from_millis(200), threshold));
        assert!(view.is_stale(t0 + Duration::from_millis(501), threshold));

        assert!(registry.view(None).is_stale(t0, threshold));
        // Stale sources are still retained
        assert!(registry.contains(ip(2)));
    }
}
