//! Scene object storage types
//!
//! Objects keep a cached world transform that is only recomputed when something
//! touching it changed (dirty flag), mirroring how views only re-upload what moved.

use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Unique identifier within its scene
    pub id: i64,

    // Transform properties
    pub position: Vec3,
    pub scale: Vec3,
    pub rotation: Quat,

    /// Units per second, applied during scene update
    pub velocity: Vec3,

    /// Cached world transform
    pub world_transform: Mat4,
    /// Transform needs recalculation
    pub transform_dirty: bool,

    pub visible: bool,
}

impl SceneObject {
    pub fn new(position: Vec3) -> Self {
        Self {
            id: 0,
            position,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            world_transform: Mat4::IDENTITY,
            transform_dirty: true,
            visible: true,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn mark_transform_dirty(&mut self) {
        self.transform_dirty = true;
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Vec3::ZERO
    }

    /// Move by `velocity * seconds`
    pub fn advance(&mut self, seconds: f32) {
        if self.is_moving() {
            self.position += self.velocity * seconds;
            self.mark_transform_dirty();
        }
    }

    /// Recalculate the cached world transform if dirty
    pub fn update_transform(&mut self) -> bool {
        if !self.transform_dirty {
            return false;
        }

        self.world_transform =
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
        self.transform_dirty = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_creation() {
        let object = SceneObject::new(Vec3::X);
        assert!(object.visible);
        assert!(object.transform_dirty);
        assert!(!object.is_moving());
    }

    #[test]
    fn test_transform_cached_until_dirty() {
        let mut object = SceneObject::new(Vec3::new(1.0, 2.0, 3.0));

        assert!(object.update_transform());
        assert!(!object.update_transform());
        assert_eq!(
            object.world_transform.transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 2.0, 3.0)
        );

        object.scale = Vec3::splat(2.0);
        object.mark_transform_dirty();
        assert!(object.update_transform());
        assert_eq!(
            object.world_transform.transform_point3(Vec3::ONE),
            Vec3::new(3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn test_advance() {
        let mut object = SceneObject::new(Vec3::ZERO).with_velocity(Vec3::new(10.0, 0.0, 0.0));
        object.transform_dirty = false;

        object.advance(0.1);
        assert!((object.position.x - 1.0).abs() < 1e-6);
        assert!(object.transform_dirty);
    }

    #[test]
    fn test_static_object_stays_clean() {
        let mut object = SceneObject::new(Vec3::ZERO);
        object.transform_dirty = false;
        object.advance(0.1);
        assert!(!object.transform_dirty);
    }
}
