//! Main loop configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MainLoopConfig {
    /// Frame budget the loop paces itself to
    pub min_frame_time: Duration,
    /// Shortest sleep between two cycles, even when a cycle overran its budget
    pub min_delay: Duration,
    /// Cap for the elapsed time handed to scenes
    pub max_update_time: Duration,
    /// Pause after a failed cycle before trying again
    pub failure_backoff: Duration,
    /// Size of the fan-out worker pool. `None` uses one worker per core.
    pub worker_threads: Option<usize>,
    /// Pin the scheduler thread to this core index
    pub main_loop_core: Option<usize>,
}

impl Default for MainLoopConfig {
    fn default() -> Self {
        Self {
            min_frame_time: Duration::from_secs_f64(1.0 / 60.0),
            min_delay: Duration::from_millis(10),
            max_update_time: Duration::from_millis(100),
            failure_backoff: Duration::from_secs(1),
            worker_threads: None,
            main_loop_core: None,
        }
    }
}

impl MainLoopConfig {
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.min_frame_time = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
        self
    }

    /// Time to sleep before the next cycle, given how long the last one took
    pub fn pacing_delay(&self, last_cycle: Duration) -> Duration {
        self.min_frame_time
            .saturating_sub(last_cycle)
            .max(self.min_delay)
    }
}
