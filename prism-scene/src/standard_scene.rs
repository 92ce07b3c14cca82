//! Default scene implementation with array-based object storage
//!
//! Objects live in a Vec behind an RwLock so any number of views can read them while
//! rendering. Structural changes requested by application code are queued and applied at
//! well-defined points of the cycle: before the next update, or beside rendering.

use crate::scene::{Scene, SceneError, ViewInformation};
use crate::types::SceneObject;
use crate::update_state::UpdateState;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// A queued manipulation of the scene's objects
pub type SceneAction = Box<dyn FnOnce(&mut Vec<SceneObject>) -> Result<(), SceneError> + Send>;

pub struct StandardScene {
    name: String,

    /// Array-based storage for scene objects
    objects: RwLock<Vec<SceneObject>>,
    id_counter: AtomicI64,

    views: RwLock<Vec<ViewInformation>>,

    before_update: Mutex<Vec<SceneAction>>,
    beside_render: Mutex<Vec<SceneAction>>,

    resources_loaded: AtomicBool,
    simulated_time: Mutex<Duration>,

    // Statistics
    update_count: AtomicU64,
    update_beside_count: AtomicU64,
}

impl StandardScene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(Vec::with_capacity(16)),
            id_counter: AtomicI64::new(1),
            views: RwLock::new(Vec::new()),
            before_update: Mutex::new(Vec::new()),
            beside_render: Mutex::new(Vec::new()),
            resources_loaded: AtomicBool::new(false),
            simulated_time: Mutex::new(Duration::ZERO),
            update_count: AtomicU64::new(0),
            update_beside_count: AtomicU64::new(0),
        }
    }

    /// Add an object right away. Returns the id of the new object.
    pub fn add_object(&self, mut object: SceneObject) -> i64 {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        object.id = id;
        object.mark_transform_dirty();

        self.objects.write().push(object);
        id
    }

    pub fn remove_object(&self, id: i64) -> bool {
        let mut objects = self.objects.write();
        if let Some(pos) = objects.iter().position(|object| object.id == id) {
            objects.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn find_object(&self, id: i64) -> Option<SceneObject> {
        self.objects.read().iter().find(|object| object.id == id).cloned()
    }

    /// Queue a manipulation applied at the start of the next update.
    ///
    /// A failing action fails that update.
    pub fn queue_before_update<F>(&self, action: F)
    where
        F: FnOnce(&mut Vec<SceneObject>) -> Result<(), SceneError> + Send + 'static,
    {
        self.before_update.lock().push(Box::new(action));
    }

    /// Queue a manipulation applied during the next update-beside-render step
    pub fn queue_beside_render<F>(&self, action: F)
    where
        F: FnOnce(&mut Vec<SceneObject>) -> Result<(), SceneError> + Send + 'static,
    {
        self.beside_render.lock().push(Box::new(action));
    }

    /// Visit all visible objects under a read lock
    pub fn render_objects<F>(&self, mut callback: F)
    where
        F: FnMut(&SceneObject),
    {
        let objects = self.objects.read();
        for object in objects.iter().filter(|object| object.visible) {
            callback(object);
        }
    }

    pub fn register_view(&self, view: ViewInformation) -> Result<(), SceneError> {
        let mut views = self.views.write();
        if views.contains(&view) {
            return Err(SceneError::ViewAlreadyRegistered(view));
        }
        views.push(view);
        Ok(())
    }

    pub fn registered_view_count(&self) -> usize {
        self.views.read().len()
    }

    /// Mark resources as loaded, called by views on their first prepare step
    pub fn load_resources(&self) {
        if !self.resources_loaded.swap(true, Ordering::AcqRel) {
            log::debug!("Scene '{}' loaded its resources", self.name);
        }
    }

    pub fn resources_loaded(&self) -> bool {
        self.resources_loaded.load(Ordering::Acquire)
    }

    pub fn simulated_time(&self) -> Duration {
        *self.simulated_time.lock()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }

    pub fn update_beside_count(&self) -> u64 {
        self.update_beside_count.load(Ordering::Relaxed)
    }

    fn apply_actions(&self, actions: Vec<SceneAction>) -> Vec<SceneError> {
        if actions.is_empty() {
            return Vec::new();
        }

        let mut objects = self.objects.write();
        actions
            .into_iter()
            .filter_map(|action| action(&mut *objects).err())
            .collect()
    }
}

impl Scene for StandardScene {
    fn update(&self, state: &UpdateState) -> Result<(), SceneError> {
        self.update_count.fetch_add(1, Ordering::Relaxed);

        let actions = std::mem::take(&mut *self.before_update.lock());
        let errors = self.apply_actions(actions);
        if !errors.is_empty() {
            let reason = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SceneError::UpdateFailed {
                scene: self.name.clone(),
                reason,
            });
        }

        let seconds = state.update_time().as_secs_f32();
        let mut objects = self.objects.write();
        for object in objects.iter_mut() {
            object.advance(seconds);
            object.update_transform();
        }
        drop(objects);

        *self.simulated_time.lock() += state.update_time();
        Ok(())
    }

    fn update_beside_render(&self, _state: &UpdateState) {
        self.update_beside_count.fetch_add(1, Ordering::Relaxed);

        let actions = std::mem::take(&mut *self.beside_render.lock());
        for error in self.apply_actions(actions) {
            log::warn!("Scene '{}': beside-render action failed: {}", self.name, error);
        }
    }

    fn unload_resources(&self) {
        if self.resources_loaded.swap(false, Ordering::AcqRel) {
            log::debug!("Scene '{}' unloaded its resources", self.name);
        }
    }

    /// Drop all objects and queued actions; `force` also drops view registrations.
    fn clear(&self, force: bool) {
        self.objects.write().clear();
        self.before_update.lock().clear();
        self.beside_render.lock().clear();

        if force {
            self.views.write().clear();
        }
    }

    fn is_view_registered(&self, view: &ViewInformation) -> bool {
        self.views.read().contains(view)
    }

    fn deregister_view(&self, view: &ViewInformation) {
        self.views.write().retain(|registered| registered != view);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::sync::Arc;

    #[test]
    fn test_add_remove_objects() {
        let scene = StandardScene::new("test");

        let id1 = scene.add_object(SceneObject::new(Vec3::ZERO));
        let id2 = scene.add_object(SceneObject::new(Vec3::X));
        assert_ne!(id1, id2);
        assert_eq!(scene.object_count(), 2);

        assert!(scene.remove_object(id1));
        assert!(!scene.remove_object(id1));
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_update_moves_objects() {
        let scene = StandardScene::new("test");
        let id = scene.add_object(
            SceneObject::new(Vec3::ZERO).with_velocity(Vec3::new(0.0, 10.0, 0.0)),
        );

        let state = UpdateState::new(Duration::from_millis(100));
        scene.update(&state).unwrap();

        let object = scene.find_object(id).unwrap();
        assert!((object.position.y - 1.0).abs() < 1e-5);
        assert!(!object.transform_dirty);
        assert_eq!(scene.update_count(), 1);
        assert_eq!(scene.simulated_time(), Duration::from_millis(100));
    }

    #[test]
    fn test_queued_actions_applied_before_update() {
        let scene = StandardScene::new("test");
        scene.queue_before_update(|objects| {
            objects.push(SceneObject::new(Vec3::ONE));
            Ok(())
        });
        assert_eq!(scene.object_count(), 0);

        scene.update(&UpdateState::new(Duration::from_millis(16))).unwrap();
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn test_failing_action_fails_update() {
        let scene = StandardScene::new("broken");
        scene.queue_before_update(|_| Err(SceneError::ObjectNotFound(42)));

        let result = scene.update(&UpdateState::new(Duration::from_millis(16)));
        assert!(matches!(result, Err(SceneError::UpdateFailed { .. })));

        // The queue is drained, so the next update succeeds
        assert!(scene.update(&UpdateState::new(Duration::from_millis(16))).is_ok());
    }

    #[test]
    fn test_beside_render_actions() {
        let scene = StandardScene::new("test");
        let id = scene.add_object(SceneObject::new(Vec3::ZERO));
        scene.queue_beside_render(move |objects| {
            for object in objects.iter_mut().filter(|o| o.id == id) {
                object.visible = false;
            }
            Ok(())
        });

        scene.update_beside_render(&UpdateState::new(Duration::from_millis(16)));
        assert!(!scene.find_object(id).unwrap().visible);
        assert_eq!(scene.update_beside_count(), 1);

        let mut rendered = 0;
        scene.render_objects(|_| rendered += 1);
        assert_eq!(rendered, 0);
    }

    #[test]
    fn test_view_registration() {
        let scene = StandardScene::new("test");
        let view = ViewInformation::allocate();

        scene.register_view(view).unwrap();
        assert!(scene.is_view_registered(&view));
        assert!(matches!(
            scene.register_view(view),
            Err(SceneError::ViewAlreadyRegistered(_))
        ));

        scene.deregister_view(&view);
        assert!(!scene.is_view_registered(&view));
    }

    #[test]
    fn test_clear_and_unload() {
        let scene = StandardScene::new("test");
        let view = ViewInformation::allocate();
        scene.register_view(view).unwrap();
        scene.add_object(SceneObject::new(Vec3::ZERO));
        scene.load_resources();

        scene.clear(false);
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.registered_view_count(), 1);

        scene.clear(true);
        assert_eq!(scene.registered_view_count(), 0);

        scene.unload_resources();
        assert!(!scene.resources_loaded());
    }

    #[test]
    fn test_concurrent_rendering() {
        use std::thread;

        let scene = Arc::new(StandardScene::new("shared"));
        scene.add_object(SceneObject::new(Vec3::ZERO));
        scene.add_object(SceneObject::new(Vec3::X));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let scene = Arc::clone(&scene);
                thread::spawn(move || {
                    let mut count = 0;
                    scene.render_objects(|_| count += 1);
                    count
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
