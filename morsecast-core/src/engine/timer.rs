//! Periodic tick source for the scheduler.
//!
//! The period is measured from the *start* of the previous tick's work, so a
//! slow tick shortens the following wait instead of pushing every later tick
//! back: `next = max(0, interval − elapsed_work)`.

use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Delay before the next tick given how long the last tick's work took.
pub fn next_delay(interval: Duration, elapsed_work: Duration) -> Duration {
    interval.saturating_sub(elapsed_work)
}

#[derive(Debug)]
pub struct TickTimer {
    interval: Duration,
    deadline: Instant,
}

impl TickTimer {
    /// New timer whose first tick fires immediately.
    pub fn start(interval: Duration) -> Self {
        Self {
            interval,
            deadline: Instant::now(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Resolve at the current deadline. Cancel-safe: dropping the future
    /// leaves the deadline untouched.
    pub async fn tick(&self) {
        sleep_until(self.deadline).await;
    }

    /// Arm the next tick after work that began at `work_started`.
    pub fn schedule_next(&mut self, work_started: Instant) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(work_started);
        self.deadline = now + next_delay(self.interval, elapsed);
    }

    /// Drop the pending tick and start over with a new interval.
    pub fn restart(&mut self, interval: Duration) {
        *self = Self::start(interval);
    }
}
