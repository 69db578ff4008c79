//! Run timer

use std::time::Duration;
use tokio::time::Instant;

/// Measures how long the current run has taken
#[derive(Debug, Clone, Copy)]
pub struct RunTimer {
    start: Instant,
}

impl RunTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.elapsed() >= duration
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for RunTimer {
    fn default() -> Self {
        Self::new()
    }
}
