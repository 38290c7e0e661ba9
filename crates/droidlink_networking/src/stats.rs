//! # Link Statistics
//!
//! Counters and the message-rate estimate shown on the status display.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Cumulative link counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Datagrams pulled off the socket.
    pub datagrams_received: u64,
    /// Datagrams that decoded to a telemetry frame.
    pub frames_accepted: u64,
    /// Datagrams dropped as malformed.
    pub datagrams_rejected: u64,
    /// Distinct sources seen.
    pub sources_discovered: u64,
    /// Frames presumed lost from the selected source.
    pub frames_dropped: u64,
    /// Command datagrams handed to the socket.
    pub commands_sent: u64,
    /// Command datagrams lost to send errors.
    pub send_failures: u64,
    /// Receive errors that ended a drain early.
    pub recv_errors: u64,
}

/// Arrival-rate estimate over a sliding window of inter-arrival intervals.
#[derive(Clone, Debug)]
pub struct RateEstimator {
    intervals: VecDeque<Duration>,
    window: usize,
    last: Option<Instant>,
}

impl RateEstimator {
    /// Creates an estimator averaging the last `window` intervals.
    ///
    /// A zero window is treated as one.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            intervals: VecDeque::with_capacity(window),
            window,
            last: None,
        }
    }

    /// Records an arrival at `now`.
    pub fn record(&mut self, now: Instant) {
        if let Some(last) = self.last {
            if self.intervals.len() == self.window {
                self.intervals.pop_front();
            }
            self.intervals.push_back(now.saturating_duration_since(last));
        }
        self.last = Some(now);
    }

    /// Mean arrival frequency in Hz.
    ///
    /// `0.0` until two arrivals have been recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hz(&self) -> f64 {
        let total: Duration = self.intervals.iter().sum();
        if self.intervals.is_empty() || total.is_zero() {
            return 0.0;
        }
        self.intervals.len() as f64 / total.as_secs_f64()
    }

    /// Number of intervals currently in the window.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.intervals.len()
    }

    /// Forgets every sample.
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_samples_is_zero() {
        let mut rate = RateEstimator::new(20);
        assert!(rate.hz().abs() < f64::EPSILON);

        rate.record(Instant::now());
        assert_eq!(rate.samples(), 0);
        assert!(rate.hz().abs() < f64::EPSILON);
    }

    #[test]
    fn test_steady_rate() {
        let mut rate = RateEstimator::new(20);
        let t0 = Instant::now();
        for i in 0..11u32 {
            rate.record(t0 + Duration::from_millis(40) * i);
        }
        assert_eq!(rate.samples(), 10);
        assert!((rate.hz() - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_slides() {
        let mut rate = RateEstimator::new(4);
        let mut now = Instant::now();
        rate.record(now);
        // Four slow intervals, then four fast ones push them out
        for _ in 0..4 {
            now += Duration::from_millis(100);
            rate.record(now);
        }
        assert!((rate.hz() - 10.0).abs() < 1e-6);
        for _ in 0..4 {
            now += Duration::from_millis(10);
            rate.record(now);
        }
        assert_eq!(rate.samples(), 4);
        assert!((rate.hz() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_reset() {
        let mut rate = RateEstimator::new(0);
        let t0 = Instant::now();
        rate.record(t0);
        rate.record(t0 + Duration::from_millis(5));
        assert_eq!(rate.samples(), 1);

        rate.reset();
        assert_eq!(rate.samples(), 0);
        rate.record(t0 + Duration::from_millis(10));
        assert_eq!(rate.samples(), 0);
    }
}
