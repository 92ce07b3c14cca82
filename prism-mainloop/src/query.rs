//! Working sets derived from a view snapshot
//!
//! Pure functions: recomputed before and after the update/prepare phase, because a
//! prepare step may bind a view to a device for the first time.

use crate::view::View;
use prism_device::EngineDevice;
use prism_scene::{Camera, Scene};
use std::sync::Arc;

/// Distinct scenes and cameras referenced by a set of views, in first-seen order
#[derive(Default)]
pub struct ScenesAndCameras {
    pub scenes: Vec<Arc<dyn Scene>>,
    pub cameras: Vec<Arc<Camera>>,
}

pub fn query_scenes_and_cameras(views: &[Arc<dyn View>]) -> ScenesAndCameras {
    let mut result = ScenesAndCameras::default();

    for view in views {
        if let Some(scene) = view.scene() {
            if !result.scenes.iter().any(|known| prism_scene::same_scene(known, &scene)) {
                result.scenes.push(scene);
            }
        }

        if let Some(camera) = view.camera() {
            if !result.cameras.iter().any(|known| Arc::ptr_eq(known, &camera)) {
                result.cameras.push(camera);
            }
        }
    }

    result
}

/// Distinct devices referenced by a set of views, in first-seen order
pub fn query_devices_in_use(views: &[Arc<dyn View>]) -> Vec<Arc<EngineDevice>> {
    let mut devices: Vec<Arc<EngineDevice>> = Vec::new();

    for device in views.iter().filter_map(|view| view.device()) {
        if !devices.iter().any(|known| **known == *device) {
            devices.push(device);
        }
    }

    devices
}
