//! The view contract driven by the main loop

use crate::error::ViewError;
use prism_device::EngineDevice;
use prism_scene::{Camera, Scene, ViewInformation};
use std::sync::Arc;

/// Deferred work returned by a successful prepare step.
///
/// Continuations run on the scheduler thread after every prepare of the cycle has settled.
pub type Continuation = Box<dyn FnOnce() + Send>;

/// A scene, a camera and a device bound to one presentable surface.
///
/// Views are created and owned by application code; the main loop only holds a weak
/// registration to them. All methods take `&self`: implementations keep their mutable
/// state behind their own locks, but the main loop guarantees it never calls `prepare_render`
/// or `render` concurrently for the same view.
pub trait View: Send + Sync {
    /// The device this view renders on. `None` until its first prepare step picked one.
    fn device(&self) -> Option<Arc<EngineDevice>>;

    fn scene(&self) -> Option<Arc<dyn Scene>>;

    fn camera(&self) -> Option<Arc<Camera>>;

    /// Registration key of this view on its scene
    fn view_information(&self) -> Option<ViewInformation>;

    /// Bring device-bound resources up to date for the coming render step
    fn prepare_render(&self) -> Result<Vec<Continuation>, ViewError>;

    fn render(&self) -> Result<(), ViewError>;

    fn reset_flags_before_rendering(&self);

    /// Release surface and UI resources after deregistration
    fn unload_view_resources(&self) -> Result<(), ViewError>;

    /// Notified when the view enters or leaves the main loop.
    ///
    /// Called while the main loop's view registry is locked: must not call back into the loop.
    fn set_registered_on_main_loop(&self, _registered: bool) {}
}

/// Identity comparison of two shared views
pub fn same_view(a: &Arc<dyn View>, b: &Arc<dyn View>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Whether `view` is currently bound to `device`
pub(crate) fn renders_on(view: &Arc<dyn View>, device: &EngineDevice) -> bool {
    view.device().is_some_and(|bound| *bound == *device)
}
