//! Camera shared between views and the main loop
//!
//! The transform lives behind an RwLock so views can read it from render threads while
//! application code moves the camera. Every change raises `state_changed`, which the main
//! loop clears once per cycle after all views rendered.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 500.0,
        }
    }
}

/// GPU-facing camera block
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub position: [f32; 4],
}

pub struct Camera {
    transform: RwLock<CameraTransform>,
    aspect_ratio: RwLock<f32>,
    state_changed: AtomicBool,
}

impl Camera {
    pub fn new(transform: CameraTransform, aspect_ratio: f32) -> Self {
        Self {
            transform: RwLock::new(transform),
            aspect_ratio: RwLock::new(aspect_ratio),
            // New cameras have never been consumed by a view
            state_changed: AtomicBool::new(true),
        }
    }

    pub fn transform(&self) -> CameraTransform {
        *self.transform.read()
    }

    pub fn set_position(&self, position: Vec3) {
        self.update_transform(|t| t.position = position);
    }

    pub fn set_target(&self, target: Vec3) {
        self.update_transform(|t| t.target = target);
    }

    pub fn update_transform<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut CameraTransform),
    {
        let mut transform = self.transform.write();
        update_fn(&mut transform);
        self.state_changed.store(true, Ordering::Release);
    }

    pub fn set_aspect_ratio(&self, aspect_ratio: f32) {
        *self.aspect_ratio.write() = aspect_ratio;
        self.state_changed.store(true, Ordering::Release);
    }

    pub fn state_changed(&self) -> bool {
        self.state_changed.load(Ordering::Acquire)
    }

    pub fn set_state_changed(&self, changed: bool) {
        self.state_changed.store(changed, Ordering::Release);
    }

    pub fn view_matrix(&self) -> Mat4 {
        let t = self.transform.read();
        Mat4::look_at_rh(t.position, t.target, t.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let t = self.transform.read();
        Mat4::perspective_rh(t.fov_y, *self.aspect_ratio.read(), t.near, t.far)
    }

    pub fn uniform(&self) -> CameraUniform {
        let view = self.view_matrix();
        let projection = self.projection_matrix();
        let position = self.transform.read().position;

        CameraUniform {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_projection: (projection * view).to_cols_array_2d(),
            position: position.extend(1.0).to_array(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraTransform::default(), 16.0 / 9.0)
    }
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("transform", &*self.transform.read())
            .field("state_changed", &self.state_changed())
            .finish()
    }
}
