//! Monotonic time source and deadline checks (spec §4.8).

use std::time::{Duration, Instant};

/// A soft deadline for one scheduler or synchronizer pass. Compute is never
/// preempted — `is_expired` is consulted only between instances/entries.
#[derive(Debug)]
pub struct TimeSlice {
    start: Instant,
    budget: Duration,
}

impl TimeSlice {
    pub fn new(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.budget
    }
}
