//! # Tick Loop
//!
//! Fixed-timestep pacing for the link binaries.
//!
//! ## Design
//!
//! Each tick must:
//! - Drain every waiting datagram before any command is flushed
//! - Let caller work enqueue commands between drain and flush
//! - Never block on the socket; the only wait is the pacing sleep

use std::time::{Duration, Instant};

use crate::DEFAULT_TICK_RATE;

/// Fixed-timestep tick loop controller.
///
/// Keeps a steady tick rate regardless of processing time.
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Time of last tick.
    last_tick: Instant,
    /// Accumulated time since last tick.
    accumulator: Duration,
    /// Total ticks executed.
    tick_count: u64,
    /// Tick time statistics.
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed.
    pub min_tick: Duration,
    /// Longest tick observed.
    pub max_tick: Duration,
    /// Rolling average tick duration.
    pub avg_tick: Duration,
    /// Ticks that overran their budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn fresh(tick_duration: Duration) -> Self {
        Self {
            min_tick: Duration::MAX,
            max_tick: Duration::ZERO,
            avg_tick: tick_duration,
            late_ticks: 0,
            total_ticks: 0,
        }
    }
}

impl TickLoop {
    /// Creates a tick loop running `tick_rate` times per second.
    ///
    /// A zero rate is treated as one.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_secs(1) / tick_rate.max(1);

        Self {
            tick_duration,
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(tick_duration),
        }
    }

    /// Returns true if a tick is due.
    ///
    /// Call this in a loop until it returns false.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now.duration_since(self.last_tick);
        self.last_tick = now;

        self.accumulator >= self.tick_duration
    }

    /// Marks the start of a tick and returns its start time.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Marks the end of a tick started at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();

        self.stats.total_ticks += 1;
        self.stats.min_tick = self.stats.min_tick.min(duration);
        self.stats.max_tick = self.stats.max_tick.max(duration);

        // Rolling average
        self.stats.avg_tick = (self.stats.avg_tick * 15 + duration) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Sleeps until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let elapsed = self.last_tick.elapsed();
        if let Some(remaining) = self.tick_duration.checked_sub(elapsed) {
            std::thread::sleep(remaining);
        }
    }

    /// Returns the number of ticks begun.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Returns tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Returns the target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_loop_creation() {
        let tick_loop = TickLoop::default();
        assert_eq!(tick_loop.tick_count(), 0);
        assert_eq!(tick_loop.tick_duration(), Duration::from_millis(40));
        assert_eq!(TickLoop::new(0).tick_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_tick_execution() {
        let mut tick_loop = TickLoop::new(1000);

        std::thread::sleep(Duration::from_millis(5));
        assert!(tick_loop.should_tick());

        let start = tick_loop.begin_tick();
        tick_loop.end_tick(start);

        assert_eq!(tick_loop.tick_count(), 1);
        assert_eq!(tick_loop.stats().total_ticks, 1);
    }

    #[test]
    fn test_stats_tracking() {
        let mut tick_loop = TickLoop::new(1000);

        for _ in 0..10 {
            std::thread::sleep(Duration::from_micros(100));
            while tick_loop.should_tick() {
                let start = tick_loop.begin_tick();
                std::thread::sleep(Duration::from_micros(50));
                tick_loop.end_tick(start);
            }
        }

        let stats = *tick_loop.stats();
        assert!(stats.total_ticks > 0);
        assert!(stats.min_tick > Duration::ZERO);
        assert!(stats.min_tick <= stats.max_tick);

        tick_loop.reset_stats();
        assert_eq!(tick_loop.stats().total_ticks, 0);
    }

    #[test]
    fn test_wait_for_next_tick_paces() {
        let mut tick_loop = TickLoop::new(100);
        let _ = tick_loop.should_tick();
        let start = Instant::now();
        tick_loop.wait_for_next_tick();
        assert!(start.elapsed() <= Duration::from_millis(500));
        assert!(tick_loop.should_tick());
    }
}
