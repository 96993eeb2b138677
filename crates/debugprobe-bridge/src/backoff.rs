//! Exponential backoff with jitter for bridge reconnection: starts at
//! 1s, doubles to a 30s cap.

use rand::Rng;
use std::time::Duration;

/// Tracks the current reconnect delay across repeated `Failed`
/// transitions; `reset` is called once a connection is registered.
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Build a backoff starting at `initial`, doubling up to `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Reset to the initial delay, e.g. after a successful
    /// registration.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    /// The jittered delay to wait before the next reconnect attempt,
    /// then double the underlying delay (capped at `max`).
    pub fn next_delay(&mut self) -> Duration {
        let jitter: f64 = rand::rng().random_range(0.8..1.2);
        let delay = self.current.mul_f64(jitter);
        self.current = (self.current * 2).min(self.max);
        delay
    }
}
