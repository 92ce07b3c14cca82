//! The scene contract consumed by the main loop

use crate::update_state::UpdateState;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Registration key of one view on one scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewInformation {
    id: u64,
}

impl ViewInformation {
    /// Allocate a process-wide unique key
    pub fn allocate() -> Self {
        Self {
            id: NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ViewInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene '{scene}' failed to update: {reason}")]
    UpdateFailed { scene: String, reason: String },

    #[error("{0} is already registered on this scene")]
    ViewAlreadyRegistered(ViewInformation),

    #[error("scene object {0} not found")]
    ObjectNotFound(i64),
}

/// An independently owned collection of renderable objects.
///
/// Scenes are shared as `Arc<dyn Scene>` between application code, views and the main loop.
/// The main loop calls `update` and `update_beside_render` at most once per cycle, possibly
/// on a worker thread, and never concurrently for the same scene.
pub trait Scene: Send + Sync {
    /// Advance simulation state. A failure here aborts rendering for the whole cycle.
    fn update(&self, state: &UpdateState) -> Result<(), SceneError>;

    /// Bookkeeping that runs while views render the state produced by `update`
    fn update_beside_render(&self, state: &UpdateState);

    fn unload_resources(&self);

    fn clear(&self, force: bool);

    fn is_view_registered(&self, view: &ViewInformation) -> bool;

    fn deregister_view(&self, view: &ViewInformation);

    /// Human readable name for logs and instrumentation
    fn name(&self) -> &str {
        "scene"
    }
}

/// Identity comparison of two shared scenes
pub fn same_scene(a: &Arc<dyn Scene>, b: &Arc<dyn Scene>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
