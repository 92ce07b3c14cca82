//! Per-cycle timing information handed to scenes

use std::time::Duration;

/// Default cap applied to the elapsed time of one cycle
pub const MAX_UPDATE_TIME: Duration = Duration::from_millis(100);

/// Elapsed time since the previous cycle, created fresh for every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateState {
    update_time: Duration,
    raw_time: Duration,
}

impl UpdateState {
    /// Cap `elapsed` at `max` so a stall never turns into one huge simulation step.
    pub fn capped(elapsed: Duration, max: Duration) -> Self {
        Self {
            update_time: elapsed.min(max),
            raw_time: elapsed,
        }
    }

    pub fn new(elapsed: Duration) -> Self {
        Self::capped(elapsed, MAX_UPDATE_TIME)
    }

    /// Time the simulation advances by in this cycle
    pub fn update_time(&self) -> Duration {
        self.update_time
    }

    pub fn update_time_millis(&self) -> f64 {
        self.update_time.as_secs_f64() * 1000.0
    }

    /// Elapsed wall-clock time before the cap was applied
    pub fn raw_time(&self) -> Duration {
        self.raw_time
    }

    pub fn was_capped(&self) -> bool {
        self.raw_time > self.update_time
    }
}
