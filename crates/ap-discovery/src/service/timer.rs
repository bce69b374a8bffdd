//! Lazily armed periodic timer state.
//!
//! The owner reports `deadline()` to its driver and calls `on_tick` when it
//! is reached; no thread or task is spawned here.

use std::time::Duration;

use crate::domain::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTimer {
    interval: Duration,
    next: Option<Timestamp>,
}

impl RetryTimer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the timer unless it is already running.
    pub fn arm(&mut self, now: Timestamp) {
        if self.next.is_none() {
            self.next = Some(now.add(self.interval));
        }
    }

    pub fn disarm(&mut self) {
        self.next = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.next
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.next.is_some_and(|next| next <= now)
    }

    /// Schedule the next firing one interval from `now`.
    pub fn reschedule(&mut self, now: Timestamp) {
        self.next = Some(now.add(self.interval));
    }
}
