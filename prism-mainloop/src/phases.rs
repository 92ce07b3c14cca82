//! The two fan-out phases of a main loop cycle
//!
//! Phase 1 updates every scene while the views prepare their rendering. Views already
//! bound to a device prepare concurrently; views still without one prepare one after
//! another, because choosing a device is not safe to do in parallel. Phase 2 renders each
//! device's views in registration order while the scenes run their update-beside-render
//! work, one fan-out item per device and per scene.

use crate::error::{panic_message, MainLoopError, SceneUpdateErrors, ViewError};
use crate::instrumentation::{
    perf_render_device, perf_update_beside, perf_update_scene, ActivityScope,
    PERF_GLOBAL_RENDER_AND_UPDATE_BESIDE, PERF_GLOBAL_UPDATE_AND_PREPARE,
};
use crate::main_loop::LoopShared;
use crate::query::ScenesAndCameras;
use crate::view::{renders_on, same_view, Continuation, View};
use crossbeam_queue::SegQueue;
use prism_device::EngineDevice;
use prism_scene::{Scene, SceneError, UpdateState};
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

enum Prepared {
    Ready(Vec<Continuation>),
    Failed(Arc<dyn View>),
}

/// Run a view callback, turning a panic into a `ViewError`
fn contain<T>(call: impl FnOnce() -> Result<T, ViewError>) -> Result<T, ViewError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(ViewError::Panicked(panic_message(payload.as_ref()))))
}

fn prepare_view(view: &Arc<dyn View>) -> Prepared {
    match contain(|| view.prepare_render()) {
        Ok(continuations) => Prepared::Ready(continuations),
        Err(err) => {
            log::warn!("Deregistering view after failed prepare: {}", err);
            Prepared::Failed(Arc::clone(view))
        }
    }
}

fn update_scene(scene: &Arc<dyn Scene>, state: &UpdateState) -> Result<(), SceneError> {
    panic::catch_unwind(AssertUnwindSafe(|| scene.update(state))).unwrap_or_else(|payload| {
        Err(SceneError::UpdateFailed {
            scene: scene.name().to_string(),
            reason: format!("panicked: {}", panic_message(payload.as_ref())),
        })
    })
}

/// Views bound to a device grouped per device, plus the views without one
fn partition_by_device(
    views: &[Arc<dyn View>],
    devices: &[Arc<EngineDevice>],
) -> (Vec<Vec<Arc<dyn View>>>, Vec<Arc<dyn View>>) {
    let mut groups: Vec<(Arc<EngineDevice>, Vec<Arc<dyn View>>)> = devices
        .iter()
        .map(|device| (Arc::clone(device), Vec::new()))
        .collect();
    let mut unconfigured = Vec::new();

    for view in views {
        // Each view is looked at once, so it lands in exactly one pass
        match view.device() {
            Some(device) => match groups.iter_mut().find(|(known, _)| **known == *device) {
                Some((_, group)) => group.push(Arc::clone(view)),
                None => groups.push((device, vec![Arc::clone(view)])),
            },
            None => unconfigured.push(Arc::clone(view)),
        }
    }

    (groups.into_iter().map(|(_, group)| group).collect(), unconfigured)
}

impl LoopShared {
    /// Phase 1. Scene failures are returned after every prepare settled but before any
    /// continuation ran; view failures only deregister the view.
    pub(crate) fn update_and_prepare(
        &self,
        views: &mut Vec<Arc<dyn View>>,
        scenes: &[Arc<dyn Scene>],
        devices: &[Arc<EngineDevice>],
        state: &UpdateState,
    ) -> Result<(), MainLoopError> {
        let _phase = ActivityScope::begin(self.meter.as_ref(), PERF_GLOBAL_UPDATE_AND_PREPARE);

        let (groups, unconfigured) = partition_by_device(views, devices);

        let ((configured_prepares, unconfigured_prepares), scene_errors) = self.pool.install(|| {
            rayon::join(
                || {
                    rayon::join(
                        || {
                            groups
                                .par_iter()
                                .flat_map(|group| group.par_iter().map(prepare_view))
                                .collect::<Vec<_>>()
                        },
                        || unconfigured.iter().map(prepare_view).collect::<Vec<_>>(),
                    )
                },
                || self.update_scenes(scenes, state),
            )
        });

        if !scene_errors.is_empty() {
            return Err(SceneUpdateErrors(scene_errors).into());
        }

        let mut failed = Vec::new();
        for prepared in configured_prepares.into_iter().chain(unconfigured_prepares) {
            match prepared {
                Prepared::Ready(continuations) => {
                    for continuation in continuations {
                        continuation();
                    }
                }
                Prepared::Failed(view) => failed.push(view),
            }
        }

        for view in failed {
            self.deregister_view(&view);
            views.retain(|active| !same_view(active, &view));
        }

        for view in views.iter() {
            view.reset_flags_before_rendering();
        }

        self.update_view_registrations(views);
        Ok(())
    }

    fn update_scenes(&self, scenes: &[Arc<dyn Scene>], state: &UpdateState) -> Vec<SceneError> {
        scenes
            .par_iter()
            .enumerate()
            .filter_map(|(index, scene)| {
                let _scope = ActivityScope::begin(self.meter.as_ref(), perf_update_scene(index));
                update_scene(scene, state).err()
            })
            .collect()
    }

    /// Release every view deregistered since the last cycle. Failures are logged and
    /// never stop the remaining views from being released.
    fn update_view_registrations(&self, views: &mut Vec<Arc<dyn View>>) {
        let pending = {
            let mut registry = self.views.lock();
            if !registry.has_unregistered() {
                return;
            }
            registry.take_unregistered()
        };

        views.retain(|view| !pending.iter().any(|released| same_view(released, view)));

        for view in &pending {
            let released = contain(|| {
                view.unload_view_resources()?;

                if let (Some(scene), Some(info)) = (view.scene(), view.view_information()) {
                    if scene.is_view_registered(&info) {
                        scene.deregister_view(&info);
                    }
                }
                Ok(())
            });
            if let Err(err) = released {
                log::warn!("Error while unloading view resources: {}", err);
            }

            if let Some(scene) = view.scene() {
                if self.is_scene_orphaned(&scene) {
                    self.register_scene_for_unload(&scene);
                }
            }
        }
    }

    /// Phase 2. Render or panic failures deregister the view; they never end the cycle.
    pub(crate) fn render_and_update_beside(
        &self,
        views: &mut Vec<Arc<dyn View>>,
        working: &ScenesAndCameras,
        devices: &[Arc<EngineDevice>],
        state: &UpdateState,
    ) {
        let _phase = ActivityScope::begin(self.meter.as_ref(), PERF_GLOBAL_RENDER_AND_UPDATE_BESIDE);

        let invalid: SegQueue<Arc<dyn View>> = SegQueue::new();
        let rendering: &[Arc<dyn View>] = views.as_slice();
        let device_count = devices.len();

        self.pool.install(|| {
            (0..device_count + working.scenes.len())
                .into_par_iter()
                .for_each(|index| {
                    if index < device_count {
                        self.render_device(&devices[index], rendering, &invalid);
                    } else {
                        let scene_index = index - device_count;
                        let _scope =
                            ActivityScope::begin(self.meter.as_ref(), perf_update_beside(scene_index));
                        working.scenes[scene_index].update_beside_render(state);
                    }
                });
        });

        while let Some(view) = invalid.pop() {
            self.deregister_view(&view);
            views.retain(|active| !same_view(active, &view));
        }

        for camera in &working.cameras {
            camera.set_state_changed(false);
        }
    }

    fn render_device(
        &self,
        device: &EngineDevice,
        views: &[Arc<dyn View>],
        invalid: &SegQueue<Arc<dyn View>>,
    ) {
        let _scope = ActivityScope::begin(
            self.meter.as_ref(),
            perf_render_device(&device.adapter_description()),
        );

        for view in views.iter().filter(|view| renders_on(view, device)) {
            if let Err(err) = contain(|| view.render()) {
                log::warn!("Deregistering view on {} after failed render: {}", device, err);
                invalid.push(Arc::clone(view));
            }
        }
    }
}
