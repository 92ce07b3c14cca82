//! The engine's main loop
//!
//! One dedicated thread drives strictly sequential cycles. Each cycle paces itself to the
//! frame budget, snapshots the registered views, updates scenes and prepares views
//! (phase 1), renders views and runs update-beside-render (phase 2), then performs all
//! deferred unloads. Both phases fan out over a rayon pool owned by the loop.

use crate::cancel::CancellationToken;
use crate::config::MainLoopConfig;
use crate::error::{panic_message, MainLoopError};
use crate::instrumentation::{
    ActivityMeter, ActivityScope, NullMeter, PERF_GLOBAL_PER_FRAME, PERF_GLOBAL_WAIT_TIME,
};
use crate::query::{query_devices_in_use, query_scenes_and_cameras};
use crate::registry::ViewRegistry;
use crate::view::View;
use crate::waiter::{cycle_signal, CycleOutcome, CycleWaiter};
use crossbeam::channel::Sender;
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use prism_device::{DeviceRegistry, Drawing2DResource};
use prism_scene::{same_scene, Scene, UpdateState};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// State shared between the public handle, the loop thread and the fan-out workers
pub(crate) struct LoopShared {
    pub(crate) config: MainLoopConfig,
    pub(crate) devices: Arc<DeviceRegistry>,
    pub(crate) meter: Arc<dyn ActivityMeter>,
    pub(crate) pool: rayon::ThreadPool,

    pub(crate) views: Mutex<ViewRegistry>,
    scenes_for_unload: Mutex<Vec<Arc<dyn Scene>>>,
    resources_to_unload: SegQueue<Arc<dyn Drawing2DResource>>,
    cycle_waiters: SegQueue<Sender<CycleOutcome>>,

    /// Serializes cycles, whichever thread drives them
    cycle_lock: Mutex<()>,
    /// Restarted right after the elapsed time of a cycle has been captured
    cycle_clock: Mutex<Instant>,

    started: AtomicBool,
    running: AtomicBool,

    // Statistics
    cycles: AtomicU64,
    failed_cycles: AtomicU64,
}

/// Handle to the engine's main loop.
///
/// Constructed once by the application and shared with everything that registers views
/// or scenes. Cloning is cheap; all clones drive the same loop.
#[derive(Clone)]
pub struct EngineMainLoop {
    shared: Arc<LoopShared>,
}

/// The running loop thread returned by `EngineMainLoop::start`
pub struct MainLoopTask {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

impl MainLoopTask {
    /// Wait until cancellation was observed and the last cycle finished
    pub fn join(self) -> Result<(), MainLoopError> {
        self.handle
            .join()
            .map_err(|payload| MainLoopError::Panicked(panic_message(payload.as_ref())))
    }

    /// Cancel and wait for the loop thread
    pub fn stop(self) -> Result<(), MainLoopError> {
        self.token.cancel();
        self.join()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl EngineMainLoop {
    pub fn new(config: MainLoopConfig, devices: Arc<DeviceRegistry>) -> Result<Self, MainLoopError> {
        Self::with_meter(config, devices, Arc::new(NullMeter))
    }

    pub fn with_meter(
        config: MainLoopConfig,
        devices: Arc<DeviceRegistry>,
        meter: Arc<dyn ActivityMeter>,
    ) -> Result<Self, MainLoopError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|index| format!("prism-worker-{}", index));
        if let Some(threads) = config.worker_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        Ok(Self {
            shared: Arc::new(LoopShared {
                config,
                devices,
                meter,
                pool,
                views: Mutex::new(ViewRegistry::default()),
                scenes_for_unload: Mutex::new(Vec::new()),
                resources_to_unload: SegQueue::new(),
                cycle_waiters: SegQueue::new(),
                cycle_lock: Mutex::new(()),
                cycle_clock: Mutex::new(Instant::now()),
                started: AtomicBool::new(false),
                running: AtomicBool::new(false),
                cycles: AtomicU64::new(0),
                failed_cycles: AtomicU64::new(0),
            }),
        })
    }

    /// Spawn the loop thread.
    ///
    /// A loop can only be started once; later calls fail with `AlreadyRunning` and leave
    /// the first loop untouched.
    pub fn start(&self, token: CancellationToken) -> Result<MainLoopTask, MainLoopError> {
        if self
            .shared
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(MainLoopError::AlreadyRunning);
        }
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let loop_token = token.clone();
        let spawned = thread::Builder::new()
            .name("prism-main-loop".to_string())
            .spawn(move || shared.run(loop_token));

        match spawned {
            Ok(handle) => Ok(MainLoopTask { handle, token }),
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.started.store(false, Ordering::SeqCst);
                Err(MainLoopError::Spawn(err))
            }
        }
    }

    /// Drive exactly one cycle on the calling thread, for headless and offscreen use.
    ///
    /// Refused while the loop thread is running.
    pub fn run_single_cycle(&self) -> Result<CycleOutcome, MainLoopError> {
        if self.shared.running.load(Ordering::SeqCst) {
            return Err(MainLoopError::AlreadyRunning);
        }
        Ok(self.shared.execute_cycle())
    }

    pub fn register_view(&self, view: &Arc<dyn View>) {
        self.shared.register_view(view);
    }

    pub fn deregister_view(&self, view: &Arc<dyn View>) {
        self.shared.deregister_view(view);
    }

    pub fn register_scene_for_unload(&self, scene: &Arc<dyn Scene>) {
        self.shared.register_scene_for_unload(scene);
    }

    pub fn deregister_scene_for_unload(&self, scene: &Arc<dyn Scene>) {
        self.shared.deregister_scene_for_unload(scene);
    }

    /// Queue a 2D resource for unloading on every device once the current cycle rendered
    pub fn register_for_unload(&self, resource: Arc<dyn Drawing2DResource>) {
        self.shared.resources_to_unload.push(resource);
    }

    /// Signal released once the next cycle has finished, successfully or not
    pub fn wait_for_next_completed_cycle(&self) -> CycleWaiter {
        let (tx, waiter) = cycle_signal();

        self.shared.cycle_waiters.push(tx);

        // The loop may have drained its waiters for good in the meantime
        if self.shared.started.load(Ordering::SeqCst) && !self.shared.running.load(Ordering::SeqCst) {
            self.shared.release_waiters(CycleOutcome::Stopped);
        }
        waiter
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn active_view_count(&self) -> usize {
        self.shared.views.lock().active_count()
    }

    pub fn devices(&self) -> &Arc<DeviceRegistry> {
        &self.shared.devices
    }

    pub fn config(&self) -> &MainLoopConfig {
        &self.shared.config
    }

    pub fn stats(&self) -> MainLoopStats {
        let views = self.shared.views.lock();
        MainLoopStats {
            cycles: self.shared.cycles.load(Ordering::Relaxed),
            failed_cycles: self.shared.failed_cycles.load(Ordering::Relaxed),
            active_views: views.active_count(),
            pending_view_unloads: views.pending_count(),
            scenes_queued_for_unload: self.shared.scenes_for_unload.lock().len(),
        }
    }
}

impl LoopShared {
    fn run(&self, token: CancellationToken) {
        if let Some(core) = self.config.main_loop_core {
            pin_to_core(core);
        }
        log::info!("Main loop started with {} device(s)", self.devices.len());

        while !token.is_cancelled() {
            if self.execute_cycle() == CycleOutcome::Failed {
                // Wait some time and try rendering again
                token.wait_timeout(self.config.failure_backoff);
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.release_waiters(CycleOutcome::Stopped);
        log::info!("Main loop exiting");
    }

    /// One full cycle. Failures end the cycle but never escape it.
    pub(crate) fn execute_cycle(&self) -> CycleOutcome {
        let _serialized = self.cycle_lock.lock();

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_cycle())).unwrap_or_else(
            |payload| Err(MainLoopError::Panicked(panic_message(payload.as_ref()))),
        );

        self.cycles.fetch_add(1, Ordering::Relaxed);
        let outcome = match result {
            Ok(()) => CycleOutcome::Completed,
            Err(err) => {
                self.failed_cycles.fetch_add(1, Ordering::Relaxed);
                log::error!("Main loop cycle failed: {}", err);
                CycleOutcome::Failed
            }
        };

        self.release_waiters(outcome);
        outcome
    }

    fn run_cycle(&self) -> Result<(), MainLoopError> {
        let _frame = ActivityScope::begin(self.meter.as_ref(), PERF_GLOBAL_PER_FRAME);

        let last_cycle = self.cycle_clock.lock().elapsed();
        let delay = self.config.pacing_delay(last_cycle);
        {
            let _wait = ActivityScope::begin(self.meter.as_ref(), PERF_GLOBAL_WAIT_TIME);
            thread::sleep(delay);
        }

        let mut views = self.views.lock().snapshot();
        let working = query_scenes_and_cameras(&views);
        let devices = query_devices_in_use(&views);

        let update_state = {
            let mut clock = self.cycle_clock.lock();
            let elapsed = clock.elapsed();
            *clock = Instant::now();
            UpdateState::capped(elapsed, self.config.max_update_time)
        };

        self.update_and_prepare(&mut views, &working.scenes, &devices, &update_state)?;

        // Prepare may have bound views to devices for the first time
        let working = query_scenes_and_cameras(&views);
        let devices = query_devices_in_use(&views);

        self.render_and_update_beside(&mut views, &working, &devices, &update_state);

        self.unload_queued_scenes();
        self.unload_queued_resources();
        Ok(())
    }

    pub(crate) fn register_view(&self, view: &Arc<dyn View>) {
        {
            // The flag follows the registry state, so it changes under the same lock
            let mut views = self.views.lock();
            if !views.register(view) {
                return;
            }
            view.set_registered_on_main_loop(true);
        }

        if let Some(scene) = view.scene() {
            self.deregister_scene_for_unload(&scene);
        }
        log::debug!("View registered on main loop");
    }

    pub(crate) fn deregister_view(&self, view: &Arc<dyn View>) {
        let queued = {
            let mut views = self.views.lock();
            let queued = views.deregister(view);
            view.set_registered_on_main_loop(false);
            queued
        };
        if queued {
            log::debug!("View deregistered from main loop, resources unload on next cycle");
        }
    }

    pub(crate) fn register_scene_for_unload(&self, scene: &Arc<dyn Scene>) {
        let mut queued = self.scenes_for_unload.lock();
        if !queued.iter().any(|known| same_scene(known, scene)) {
            log::debug!("Scene '{}' queued for unload", scene.name());
            queued.push(Arc::clone(scene));
        }
    }

    pub(crate) fn deregister_scene_for_unload(&self, scene: &Arc<dyn Scene>) {
        self.scenes_for_unload
            .lock()
            .retain(|known| !same_scene(known, scene));
    }

    /// True when no live registered view renders `scene` anymore
    pub(crate) fn is_scene_orphaned(&self, scene: &Arc<dyn Scene>) -> bool {
        let active = self.views.lock().snapshot();
        !query_scenes_and_cameras(&active)
            .scenes
            .iter()
            .any(|known| same_scene(known, scene))
    }

    fn unload_queued_scenes(&self) {
        let scenes = std::mem::take(&mut *self.scenes_for_unload.lock());
        for scene in scenes {
            log::debug!("Unloading scene '{}'", scene.name());
            scene.unload_resources();
            scene.clear(true);
        }
    }

    fn unload_queued_resources(&self) {
        while let Some(resource) = self.resources_to_unload.pop() {
            for device in self.devices.iter() {
                resource.unload_resources(device);
            }
        }
    }

    fn release_waiters(&self, outcome: CycleOutcome) {
        while let Some(waiter) = self.cycle_waiters.pop() {
            // The caller may have stopped waiting
            let _ = waiter.send(outcome);
        }
    }
}

fn pin_to_core(index: usize) {
    let core = core_affinity::get_core_ids().and_then(|ids| ids.into_iter().find(|id| id.id == index));
    let pinned = core.map(core_affinity::set_for_current).unwrap_or(false);

    if pinned {
        log::info!("Main loop thread pinned to core {}", index);
    } else {
        log::warn!("Unable to pin main loop thread to core {}", index);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainLoopStats {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub active_views: usize,
    pub pending_view_unloads: usize,
    pub scenes_queued_for_unload: usize,
}
