//! Counting test doubles for views and scenes

use crate::config::MainLoopConfig;
use crate::error::ViewError;
use crate::main_loop::EngineMainLoop;
use crate::view::{Continuation, View};
use parking_lot::Mutex;
use prism_device::{
    AdapterInfo, CoreConfiguration, DeviceId, DeviceRegistry, Drawing2DResource, DriverLevel,
    EngineDevice,
};
use prism_scene::{Camera, Scene, SceneError, UpdateState, ViewInformation};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared, ordered record of calls across views and scenes
pub(crate) type EventLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn test_devices(count: usize) -> Arc<DeviceRegistry> {
    let adapters = (0..count).map(|i| AdapterInfo::new(format!("Test GPU {}", i), DriverLevel::Level11));
    Arc::new(DeviceRegistry::enumerate(adapters, CoreConfiguration::default()))
}

pub(crate) struct TestView {
    name: String,
    device: Mutex<Option<Arc<EngineDevice>>>,
    /// Device picked by the first prepare of an unconfigured view
    assigned_device: Option<Arc<EngineDevice>>,
    scene: Option<Arc<dyn Scene>>,
    camera: Option<Arc<Camera>>,
    info: ViewInformation,
    log: Option<EventLog>,
    registration_delay: Duration,

    pub fail_prepare: AtomicBool,
    pub fail_render: AtomicBool,
    pub panic_render: AtomicBool,
    pub fail_unload: AtomicBool,

    pub prepare_count: AtomicUsize,
    pub render_count: AtomicUsize,
    pub reset_count: AtomicUsize,
    pub unload_count: AtomicUsize,
    pub continuation_count: Arc<AtomicUsize>,
    pub registered: AtomicBool,
}

impl TestView {
    pub fn new() -> Self {
        Self {
            name: "view".to_string(),
            device: Mutex::new(None),
            assigned_device: None,
            scene: None,
            camera: None,
            info: ViewInformation::allocate(),
            log: None,
            registration_delay: Duration::ZERO,
            fail_prepare: AtomicBool::new(false),
            fail_render: AtomicBool::new(false),
            panic_render: AtomicBool::new(false),
            fail_unload: AtomicBool::new(false),
            prepare_count: AtomicUsize::new(0),
            render_count: AtomicUsize::new(0),
            reset_count: AtomicUsize::new(0),
            unload_count: AtomicUsize::new(0),
            continuation_count: Arc::new(AtomicUsize::new(0)),
            registered: AtomicBool::new(false),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Already configured for `device`
    pub fn on_device(self, device: &Arc<EngineDevice>) -> Self {
        *self.device.lock() = Some(Arc::clone(device));
        self
    }

    /// Unconfigured; its first prepare binds it to `device`
    pub fn assigns_device(mut self, device: &Arc<EngineDevice>) -> Self {
        self.assigned_device = Some(Arc::clone(device));
        self
    }

    pub fn with_scene(mut self, scene: Arc<dyn Scene>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Scene that also tracks this view's registration
    pub fn with_test_scene(mut self, scene: &Arc<TestScene>) -> Self {
        scene.register_view(self.info);
        self.scene = Some(Arc::clone(scene) as Arc<dyn Scene>);
        self
    }

    pub fn with_camera(mut self, camera: &Arc<Camera>) -> Self {
        self.camera = Some(Arc::clone(camera));
        self
    }

    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    /// Entering the main loop takes `delay`
    pub fn with_slow_registration(mut self, delay: Duration) -> Self {
        self.registration_delay = delay;
        self
    }

    pub fn renders(&self) -> usize {
        self.render_count.load(Ordering::SeqCst)
    }

    pub fn prepares(&self) -> usize {
        self.prepare_count.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.lock().push(format!("{}:{}", event, self.name));
        }
    }
}

impl View for TestView {
    fn device(&self) -> Option<Arc<EngineDevice>> {
        self.device.lock().clone()
    }

    fn scene(&self) -> Option<Arc<dyn Scene>> {
        self.scene.clone()
    }

    fn camera(&self) -> Option<Arc<Camera>> {
        self.camera.clone()
    }

    fn view_information(&self) -> Option<ViewInformation> {
        Some(self.info)
    }

    fn prepare_render(&self) -> Result<Vec<Continuation>, ViewError> {
        self.prepare_count.fetch_add(1, Ordering::SeqCst);
        self.record("prepare");

        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(ViewError::Prepare(format!("{} refused to prepare", self.name)));
        }

        let mut device = self.device.lock();
        if device.is_none() {
            *device = self.assigned_device.clone();
        }

        let counter = Arc::clone(&self.continuation_count);
        Ok(vec![Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })])
    }

    fn render(&self) -> Result<(), ViewError> {
        if self.panic_render.load(Ordering::SeqCst) {
            panic!("{} exploded while rendering", self.name);
        }
        if self.fail_render.load(Ordering::SeqCst) {
            return Err(ViewError::Render(format!("{} lost its surface", self.name)));
        }

        self.render_count.fetch_add(1, Ordering::SeqCst);
        self.record("render");
        Ok(())
    }

    fn reset_flags_before_rendering(&self) {
        self.reset_count.fetch_add(1, Ordering::SeqCst);
    }

    fn unload_view_resources(&self) -> Result<(), ViewError> {
        self.unload_count.fetch_add(1, Ordering::SeqCst);
        self.record("unload");

        if self.fail_unload.load(Ordering::SeqCst) {
            return Err(ViewError::Unload("surface already gone".to_string()));
        }
        Ok(())
    }

    fn set_registered_on_main_loop(&self, registered: bool) {
        if registered && !self.registration_delay.is_zero() {
            std::thread::sleep(self.registration_delay);
        }
        self.registered.store(registered, Ordering::SeqCst);
    }
}

pub(crate) struct TestScene {
    name: String,
    log: Option<EventLog>,
    views: Mutex<Vec<ViewInformation>>,

    pub fail_update: AtomicBool,
    pub update_count: AtomicUsize,
    pub beside_count: AtomicUsize,
    pub unload_count: AtomicUsize,
    pub clear_count: AtomicUsize,
    pub forced_clear_count: AtomicUsize,
    pub updates: Mutex<Vec<(Instant, Duration)>>,
}

impl TestScene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            log: None,
            views: Mutex::new(Vec::new()),
            fail_update: AtomicBool::new(false),
            update_count: AtomicUsize::new(0),
            beside_count: AtomicUsize::new(0),
            unload_count: AtomicUsize::new(0),
            clear_count: AtomicUsize::new(0),
            forced_clear_count: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_log(mut self, log: &EventLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn register_view(&self, view: ViewInformation) {
        self.views.lock().push(view);
    }

    pub fn registered_views(&self) -> usize {
        self.views.lock().len()
    }

    pub fn updates(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    fn record(&self, event: &str) {
        if let Some(log) = &self.log {
            log.lock().push(format!("{}:{}", event, self.name));
        }
    }
}

impl Scene for TestScene {
    fn update(&self, state: &UpdateState) -> Result<(), SceneError> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().push((Instant::now(), state.update_time()));
        self.record("update");

        if self.fail_update.load(Ordering::SeqCst) {
            return Err(SceneError::UpdateFailed {
                scene: self.name.clone(),
                reason: "simulation diverged".to_string(),
            });
        }
        Ok(())
    }

    fn update_beside_render(&self, _state: &UpdateState) {
        self.beside_count.fetch_add(1, Ordering::SeqCst);
        self.record("beside");
    }

    fn unload_resources(&self) {
        self.unload_count.fetch_add(1, Ordering::SeqCst);
        self.record("unload");
    }

    fn clear(&self, force: bool) {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        if force {
            self.forced_clear_count.fetch_add(1, Ordering::SeqCst);
        }
        self.record("clear");
    }

    fn is_view_registered(&self, view: &ViewInformation) -> bool {
        self.views.lock().contains(view)
    }

    fn deregister_view(&self, view: &ViewInformation) {
        self.views.lock().retain(|registered| registered != view);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Short pacing and backoff so cycles driven by tests stay fast
pub(crate) fn test_config() -> MainLoopConfig {
    MainLoopConfig {
        min_frame_time: Duration::from_millis(2),
        min_delay: Duration::from_millis(1),
        failure_backoff: Duration::from_millis(20),
        worker_threads: Some(4),
        ..MainLoopConfig::default()
    }
}

pub(crate) fn test_loop(device_count: usize) -> EngineMainLoop {
    EngineMainLoop::new(test_config(), test_devices(device_count)).unwrap()
}

pub(crate) fn device(registry: &DeviceRegistry, index: usize) -> Arc<EngineDevice> {
    registry.iter().nth(index).cloned().unwrap()
}

pub(crate) fn as_view(view: &Arc<TestView>) -> Arc<dyn View> {
    Arc::clone(view) as Arc<dyn View>
}

pub(crate) fn as_scene(scene: &Arc<TestScene>) -> Arc<dyn Scene> {
    Arc::clone(scene) as Arc<dyn Scene>
}

/// 2D resource recording every device it was unloaded from
#[derive(Default)]
pub(crate) struct TestResource {
    pub unloaded_from: Mutex<Vec<DeviceId>>,
}

impl Drawing2DResource for TestResource {
    fn unload_resources(&self, device: &EngineDevice) {
        self.unloaded_from.lock().push(device.id());
    }
}
