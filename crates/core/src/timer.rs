//! High-resolution timer for frame timing.

use std::time::{Duration, Instant};

/// High-resolution timer for measuring elapsed time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
        }
    }

    /// Get the total elapsed time since the timer was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get the time elapsed since the last call to `tick()`.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Get the delta time in seconds since the last tick.
    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    /// Reset the timer to the current time.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates frame times and reports an average once per interval.
#[derive(Debug)]
pub struct FrameStats {
    interval: Duration,
    accumulated: Duration,
    frames: u32,
}

/// Average over one reporting interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    pub frames: u32,
    pub average_frame_ms: f32,
    pub fps: f32,
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            frames: 0,
        }
    }

    /// Records one frame; returns a report when the interval has elapsed.
    pub fn record(&mut self, frame_time: Duration) -> Option<FrameReport> {
        self.accumulated += frame_time;
        self.frames += 1;

        if self.accumulated < self.interval {
            return None;
        }

        let secs = self.accumulated.as_secs_f32();
        let report = FrameReport {
            frames: self.frames,
            average_frame_ms: secs * 1000.0 / self.frames as f32,
            fps: self.frames as f32 / secs,
        };
        self.accumulated = Duration::ZERO;
        self.frames = 0;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_tick_is_monotonic() {
        let mut timer = Timer::new();
        let first = timer.tick();
        let second = timer.tick();
        assert!(first >= Duration::ZERO);
        assert!(second >= Duration::ZERO);
        assert!(timer.elapsed() >= first);
    }

    #[test]
    fn test_frame_stats_reports_after_interval() {
        let mut stats = FrameStats::new(Duration::from_millis(100));
        for _ in 0..4 {
            assert!(stats.record(Duration::from_millis(20)).is_none());
        }
        let report = stats
            .record(Duration::from_millis(20))
            .expect("interval reached");
        assert_eq!(report.frames, 5);
        assert!((report.average_frame_ms - 20.0).abs() < 0.01);
        assert!((report.fps - 50.0).abs() < 0.1);

        // Counters restart after a report
        assert!(stats.record(Duration::from_millis(20)).is_none());
    }
}
