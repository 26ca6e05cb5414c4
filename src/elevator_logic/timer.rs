//! Single shot timers for select loops.
//!
//! Each arm bumps a generation counter. [`Timer::wait`] resolves with the generation it was
//! armed with, and [`Timer::expire`] only accepts the current one, so a fire that was overtaken
//! by a re-arm or a stop is never acted on.

use std::future;
use tokio::time::{sleep_until, Duration, Instant};

/// A re-armable single shot timer, owned by the task that waits on it.
#[derive(Debug, Default)]
pub struct Timer {
    deadline: Option<Instant>,
    generation: u64,
}

impl Timer {
    /// A stopped timer
    pub fn new() -> Timer {
        Timer::default()
    }

    /// (Re)starts the timer. Any earlier pending fire is invalidated.
    pub fn arm(&mut self, duration: Duration) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = Some(Instant::now() + duration);
        self.generation
    }

    /// Stops the timer. Any pending fire is invalidated.
    pub fn stop(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.deadline = None;
    }

    /// `true` between [`arm`](Timer::arm) and the fire being accepted or the timer stopped
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left until the timer fires, `None` when stopped
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Waits for the deadline and returns the generation it belongs to.
    ///
    /// Never resolves while the timer is stopped. Cancel safe, meant for `tokio::select!`.
    pub async fn wait(&self) -> u64 {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.generation
            }
            None => future::pending().await,
        }
    }

    /// Accepts the fire of `generation`. Returns `false` for a stale fire.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.deadline.is_some() && generation == self.generation {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}
