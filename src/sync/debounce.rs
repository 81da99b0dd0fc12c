// src/sync/debounce.rs

//! Trailing-edge debouncing of user actions.
//!
//! Each [`Debouncer`] only records a deadline; the tracker loop decides when to
//! look at it. Nothing here sleeps, so the logic can be checked with made-up
//! instants.

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

use super::messages::ActionKind;

/// Coalesces repeated triggers until `window` has passed without a new one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a trigger at `now`, pushing any pending deadline back.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once per quiet period, when the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// One independent [`Debouncer`] per [`ActionKind`].
#[derive(Debug, Clone)]
pub struct ActionDebouncers {
    debouncers: BTreeMap<ActionKind, Debouncer>,
}

impl ActionDebouncers {
    pub fn new(window: Duration) -> Self {
        let debouncers = ActionKind::ALL
            .iter()
            .map(|kind| (*kind, Debouncer::new(window)))
            .collect();
        Self { debouncers }
    }

    pub fn trigger(&mut self, kind: ActionKind, now: Instant) {
        if let Some(debouncer) = self.debouncers.get_mut(&kind) {
            debouncer.trigger(now);
        }
    }

    pub fn get(&self, kind: ActionKind) -> Option<&Debouncer> {
        self.debouncers.get(&kind)
    }

    /// Earliest pending deadline across all kinds.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncers.values().filter_map(Debouncer::deadline).min()
    }

    /// Actions whose quiet period has ended, earliest deadline first.
    pub fn take_due(&mut self, now: Instant) -> Vec<ActionKind> {
        let mut due: Vec<(Instant, ActionKind)> = self
            .debouncers
            .iter()
            .filter_map(|(kind, d)| d.deadline().map(|deadline| (deadline, *kind)))
            .filter(|(deadline, _)| *deadline <= now)
            .collect();
        due.sort();
        for (_, kind) in &due {
            if let Some(debouncer) = self.debouncers.get_mut(kind) {
                debouncer.fire_if_due(now);
            }
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    pub fn cancel_all(&mut self) {
        for debouncer in self.debouncers.values_mut() {
            debouncer.cancel();
        }
    }
}
