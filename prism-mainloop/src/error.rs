//! Error types of the main loop and the views it drives

use prism_device::DeviceId;
use prism_scene::SceneError;
use std::fmt;

/// Failure of a single view. Never escapes the view's fan-out item; the view is
/// deregistered instead.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("view failed to prepare rendering: {0}")]
    Prepare(String),

    #[error("view failed to render: {0}")]
    Render(String),

    #[error("failed to unload view resources: {0}")]
    Unload(String),

    #[error("{0} was lost")]
    DeviceLost(DeviceId),

    #[error("view panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// All scene update failures of one cycle
#[derive(Debug)]
pub struct SceneUpdateErrors(pub Vec<SceneError>);

impl fmt::Display for SceneUpdateErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} scene(s) failed to update", self.0.len())?;
        for error in &self.0 {
            write!(f, "; {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SceneUpdateErrors {}

#[derive(Debug, thiserror::Error)]
pub enum MainLoopError {
    #[error("unable to start the main loop: it has already been started")]
    AlreadyRunning,

    #[error("error(s) during scene update: {0}")]
    SceneUpdate(#[from] SceneUpdateErrors),

    #[error("main loop cycle panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn the main loop thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to build the worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Best-effort text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
