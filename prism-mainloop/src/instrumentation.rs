//! Named duration measurements around the phases of a cycle

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const PERF_GLOBAL_PER_FRAME: &str = "Global.PerFrame";
pub const PERF_GLOBAL_WAIT_TIME: &str = "Global.WaitTime";
pub const PERF_GLOBAL_UPDATE_AND_PREPARE: &str = "Global.UpdateAndPrepare";
pub const PERF_GLOBAL_RENDER_AND_UPDATE_BESIDE: &str = "Global.RenderAndUpdateBeside";

pub fn perf_update_scene(scene_index: usize) -> String {
    format!("Global.UpdateScene_{}", scene_index)
}

pub fn perf_render_device(description: &str) -> String {
    format!("Global.RenderDevice_{}", description)
}

pub fn perf_update_beside(scene_index: usize) -> String {
    format!("Global.UpdateBeside_{}", scene_index)
}

/// Sink for activity durations. Called from worker threads.
pub trait ActivityMeter: Send + Sync {
    fn record(&self, activity: &str, duration: Duration);
}

/// Records the time between its creation and drop
pub struct ActivityScope<'a> {
    meter: &'a dyn ActivityMeter,
    activity: String,
    started: Instant,
}

impl<'a> ActivityScope<'a> {
    pub fn begin(meter: &'a dyn ActivityMeter, activity: impl Into<String>) -> Self {
        Self {
            meter,
            activity: activity.into(),
            started: Instant::now(),
        }
    }
}

impl Drop for ActivityScope<'_> {
    fn drop(&mut self) {
        self.meter.record(&self.activity, self.started.elapsed());
    }
}

/// Discards every measurement
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMeter;

impl ActivityMeter for NullMeter {
    fn record(&self, _activity: &str, _duration: Duration) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub count: u64,
    pub total: Duration,
    pub max: Duration,
}

impl ActivityStats {
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((self.total.as_nanos() / self.count as u128) as u64)
        }
    }
}

/// Aggregates count, total and maximum duration per activity
#[derive(Debug, Default)]
pub struct DurationMeter {
    activities: Mutex<HashMap<String, ActivityStats>>,
}

impl DurationMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, activity: &str) -> Option<ActivityStats> {
        self.activities.lock().get(activity).copied()
    }

    /// Snapshot of all activities, sorted by name
    pub fn snapshot(&self) -> Vec<(String, ActivityStats)> {
        let mut all: Vec<_> = self
            .activities
            .lock()
            .iter()
            .map(|(name, stats)| (name.clone(), *stats))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn reset(&self) {
        self.activities.lock().clear();
    }
}

impl ActivityMeter for DurationMeter {
    fn record(&self, activity: &str, duration: Duration) {
        log::trace!("{} took {:?}", activity, duration);

        let mut activities = self.activities.lock();
        let stats = activities.entry(activity.to_string()).or_default();
        stats.count += 1;
        stats.total += duration;
        stats.max = stats.max.max(duration);
    }
}
