//! Tick statistics kept by the render loop driver.

use std::time::Duration;

/// Counters and timings over every tick since the driver was created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks executed, failed ones included.
    pub ticks: u64,
    /// Ticks that pushed a camera frame.
    pub frames_pushed: u64,
    /// Ticks after which the driver scheduled another tick itself.
    pub self_scheduled: u64,
    /// Ticks skipped because a boundary call or the surface failed.
    pub failed_ticks: u64,
    /// Shortest tick in microseconds.
    pub min_tick_us: u64,
    /// Longest tick in microseconds.
    pub max_tick_us: u64,
    /// Rolling average tick duration in microseconds.
    pub avg_tick_us: u64,
}

impl TickStats {
    /// Creates empty statistics.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            frames_pushed: 0,
            self_scheduled: 0,
            failed_ticks: 0,
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: 0,
        }
    }

    /// Records one tick.
    pub fn record(&mut self, duration: Duration, frame_pushed: bool, rescheduled: bool, failed: bool) {
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.min_tick_us = self.min_tick_us.min(us);
        self.max_tick_us = self.max_tick_us.max(us);
        self.avg_tick_us = if self.ticks == 0 {
            us
        } else {
            // Rolling average, 1/16 weight on the newest sample.
            self.avg_tick_us.saturating_mul(15).saturating_add(us) / 16
        };
        self.ticks += 1;
        self.frames_pushed += u64::from(frame_pushed);
        self.self_scheduled += u64::from(rescheduled);
        self.failed_ticks += u64::from(failed);
    }

    /// Shortest tick, or zero before the first tick.
    #[must_use]
    pub fn min_tick_us(&self) -> u64 {
        if self.ticks == 0 {
            0
        } else {
            self.min_tick_us
        }
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TickStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ticks={} frames={} self_scheduled={} failed={} tick_us(min/avg/max)={}/{}/{}",
            self.ticks,
            self.frames_pushed,
            self.self_scheduled,
            self.failed_ticks,
            self.min_tick_us(),
            self.avg_tick_us,
            self.max_tick_us
        )
    }
}
