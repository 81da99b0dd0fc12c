// src/sync/timer.rs

//! The tracker's single poll timer.

use std::time::Duration;
use tokio::time::Instant;

/// Recurring poll schedule owned by one tracker instance.
///
/// `start` arms it one interval from the given instant, `tick` re-arms it after a
/// poll, `cancel` disarms it. The tracker loop sleeps until [`PollTimer::next_tick`].
#[derive(Debug, Clone)]
pub struct PollTimer {
    interval: Duration,
    next_tick: Option<Instant>,
}

impl PollTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Arm the timer. Restarting an armed timer moves its next tick.
    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_tick = None;
    }

    pub fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn next_tick(&self) -> Option<Instant> {
        self.next_tick
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_tick.is_some_and(|tick| tick <= now)
    }

    /// Schedule the following tick, if still armed.
    pub fn tick(&mut self, now: Instant) {
        if self.next_tick.is_some() {
            self.next_tick = Some(now + self.interval);
        }
    }
}
