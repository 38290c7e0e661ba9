//! # Sequence Tracking
//!
//! Lost-frame accounting from the droid's 8-bit wrapping frame counter.
//!
//! The counter is treated as a cycle: the gap is the forward distance from
//! the expected value to the received one, modulo 256. A duplicate of the
//! previous frame therefore reads as a gap of 255.

/// Outcome of observing one sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceObservation {
    /// Frames missing between the previous and this one.
    pub gap: u8,
    /// This frame is exactly the one expected.
    pub is_good: bool,
}

impl SequenceObservation {
    const GOOD: Self = Self { gap: 0, is_good: true };
}

/// Delivery health of one droid's telemetry stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceTracker {
    last_seen: Option<u8>,
    good_frames: u64,
    dropped_frames: u64,
}

impl SequenceTracker {
    /// Creates a tracker with no baseline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_seen: None,
            good_frames: 0,
            dropped_frames: 0,
        }
    }

    /// Records a received sequence number.
    ///
    /// The first observation has nothing to compare against and always
    /// counts as good.
    pub fn observe(&mut self, received: u8) -> SequenceObservation {
        let observation = match self.last_seen {
            None => SequenceObservation::GOOD,
            Some(last) => {
                let expected = last.wrapping_add(1);
                if received == expected {
                    SequenceObservation::GOOD
                } else {
                    SequenceObservation {
                        gap: received.wrapping_sub(expected),
                        is_good: false,
                    }
                }
            }
        };

        if observation.is_good {
            self.good_frames += 1;
        } else {
            self.dropped_frames += u64::from(observation.gap);
        }
        self.last_seen = Some(received);
        observation
    }

    /// Last sequence number observed.
    #[inline]
    #[must_use]
    pub const fn last_seen(&self) -> Option<u8> {
        self.last_seen
    }

    /// Frames that arrived in order.
    #[inline]
    #[must_use]
    pub const fn good_frames(&self) -> u64 {
        self.good_frames
    }

    /// Frames presumed lost, summed over all gaps.
    #[inline]
    #[must_use]
    pub const fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Fraction of frames lost, `0.0` before anything is observed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn drop_ratio(&self) -> f64 {
        let total = self.good_frames + self.dropped_frames;
        if total == 0 {
            return 0.0;
        }
        self.dropped_frames as f64 / total as f64
    }

    /// Forgets the baseline and counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_good() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.observe(137), SequenceObservation { gap: 0, is_good: true });
        assert_eq!(tracker.last_seen(), Some(137));
        assert_eq!(tracker.good_frames(), 1);
        assert_eq!(tracker.dropped_frames(), 0);
    }

    #[test]
    fn test_in_order_frames() {
        let mut tracker = SequenceTracker::new();
        for seq in 10..20 {
            assert!(tracker.observe(seq).is_good);
        }
        assert_eq!(tracker.good_frames(), 10);
        assert_eq!(tracker.dropped_frames(), 0);
        assert!(tracker.drop_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_gap_of_one() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(250);
        assert_eq!(tracker.observe(252), SequenceObservation { gap: 1, is_good: false });
        assert_eq!(tracker.dropped_frames(), 1);
        assert_eq!(tracker.last_seen(), Some(252));
    }

    #[test]
    fn test_wraparound_is_good() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(255);
        assert_eq!(tracker.observe(0), SequenceObservation { gap: 0, is_good: true });
        assert_eq!(tracker.dropped_frames(), 0);
    }

    #[test]
    fn test_gap_across_wraparound() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(253);
        // expected 254, missing 254, 255, 0
        assert_eq!(tracker.observe(1), SequenceObservation { gap: 3, is_good: false });
    }

    #[test]
    fn test_duplicate_reads_as_full_cycle() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(40);
        assert_eq!(tracker.observe(40), SequenceObservation { gap: 255, is_good: false });
        assert_eq!(tracker.dropped_frames(), 255);
    }

    #[test]
    fn test_bad_observation_never_has_zero_gap() {
        for last in 0..=255u8 {
            for received in 0..=255u8 {
                let mut tracker = SequenceTracker::new();
                tracker.observe(last);
                let obs = tracker.observe(received);
                assert_eq!(obs.is_good, obs.gap == 0);
            }
        }
    }

    #[test]
    fn test_drop_ratio_and_reset() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(0);
        tracker.observe(1);
        tracker.observe(2);
        tracker.observe(4); // one lost

        // 3 good, 1 dropped
        assert!((tracker.drop_ratio() - 0.25).abs() < 1e-9);

        tracker.reset();
        assert_eq!(tracker, SequenceTracker::new());
        assert!(tracker.observe(99).is_good);
    }
}
