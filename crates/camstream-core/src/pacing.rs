//! Frame pacing.
//!
//! The stream sends at most one part per interval. Between parts the loop
//! sleeps in short slices so it notices a disconnect quickly without
//! spinning the CPU.

use std::time::{Duration, Instant};

/// Source of time for the streaming loop.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
///
/// On ESP-IDF this yields to FreeRTOS for at least one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Result of a pacing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// A new part may start now.
    Ready,
    /// Too early; this much of the interval remains.
    Wait(Duration),
}

/// Timestamp gate between consecutive part starts.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check whether the interval since the last part start has elapsed.
    pub fn poll(&self, now: Instant) -> Pace {
        match self.last_start {
            None => Pace::Ready,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= self.interval {
                    Pace::Ready
                } else {
                    Pace::Wait(self.interval - elapsed)
                }
            }
        }
    }

    /// Record that a part started at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_start = Some(now);
    }
}
